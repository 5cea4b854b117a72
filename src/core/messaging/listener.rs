use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info, warn};

use super::codec::{read_frame, write_frame, Request, Response};
use crate::core::error::LauncherResult;

/// What the listener does with a launch request.
#[async_trait]
pub trait LaunchRequestHandler: Send + Sync {
    async fn launch(&self, url: &str) -> LauncherResult<()>;
}

/// Answer requests until the browser closes the channel.
pub async fn listen<R, W>(
    mut reader: R,
    mut writer: W,
    handler: &dyn LaunchRequestHandler,
) -> LauncherResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("native messaging listener started");
    while let Some(frame) = read_frame(&mut reader).await? {
        let response = match Request::from_json(&frame) {
            Ok(Request::Status) => Response::installed(),
            Ok(Request::Launch(url)) => {
                info!("launch requested by browser: {}", url);
                match handler.launch(&url).await {
                    Ok(()) => Response::ok(),
                    Err(e) => {
                        error!("browser launch of {} failed: {}", url, e);
                        Response::error(e.to_string())
                    }
                }
            }
            Err(e) => {
                warn!("unreadable native message: {}", e);
                Response::error(e.to_string())
            }
        };
        write_frame(&mut writer, &response).await?;
    }
    info!("native messaging channel closed");
    Ok(())
}

// Browser native-messaging framing: a 4-byte little-endian length followed
// by that many bytes of UTF-8 JSON.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::core::error::{LauncherError, LauncherResult};

const LEN_SIZE: usize = 4;
/// Browsers never send more than this to a host.
pub const MAX_MESSAGE_LEN: u32 = 64 * 1024 * 1024;

/// Raw request object. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawRequest {
    #[serde(default)]
    pub jnlp: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Launch the descriptor at this URL.
    Launch(String),
    /// Presence probe from the extension.
    Status,
}

impl Request {
    pub fn from_json(bytes: &[u8]) -> LauncherResult<Self> {
        let raw: RawRequest = serde_json::from_slice(bytes)?;
        match raw {
            RawRequest {
                jnlp: Some(url), ..
            } => Ok(Request::Launch(url)),
            RawRequest {
                status: Some(_), ..
            } => Ok(Request::Status),
            _ => Err(LauncherError::Other(
                "request has neither 'jnlp' nor 'status'".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: String,
}

impl Response {
    pub fn installed() -> Self {
        Self {
            status: "installed".into(),
        }
    }

    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: message.into(),
        }
    }
}

/// Next framed message, or `None` on a clean end of input before a new frame.
pub async fn read_frame<R>(reader: &mut R) -> LauncherResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LEN_SIZE];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf);
    if len > MAX_MESSAGE_LEN {
        return Err(LauncherError::Other(format!(
            "native message of {len} bytes exceeds limit"
        )));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> LauncherResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(message)?;
    let len = u32::try_from(body.len())
        .map_err(|_| LauncherError::Other("native message too large".into()))?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

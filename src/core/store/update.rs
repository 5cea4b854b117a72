use tracing::{info, warn};

use crate::core::descriptor::Descriptor;
use crate::core::downloader::Fetcher;
use crate::core::error::{LauncherResult, ResultExt};

/// Result of re-fetching a descriptor from its self reference.
#[derive(Debug)]
pub struct UpdateCheck {
    /// Bytes the launch should continue with.
    pub bytes: Vec<u8>,
    /// The replaced descriptor, present only when `bytes` changed.
    pub previous: Option<Descriptor>,
}

impl UpdateCheck {
    fn unchanged(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            previous: None,
        }
    }

    pub fn is_updated(&self) -> bool {
        self.previous.is_some()
    }
}

/// Compare a locally stored descriptor with the copy behind its `href`.
///
/// Only a malformed *current* descriptor is an error. Anything that goes
/// wrong with the remote copy keeps the current bytes.
pub async fn check_for_update(
    fetcher: &dyn Fetcher,
    current: Vec<u8>,
) -> LauncherResult<UpdateCheck> {
    let descriptor = Descriptor::parse(&current).context("parsing JNLP")?;

    let url = match descriptor.self_url() {
        Ok(Some(url)) => url,
        Ok(None) => {
            warn!(
                "unable to check jnlp file for update because <jnlp> tag doesn't have \
                 'href' attribute or the attribute is empty"
            );
            return Ok(UpdateCheck::unchanged(current));
        }
        Err(e) => {
            warn!("unable to check jnlp file for update because 'href' is invalid: {}", e);
            return Ok(UpdateCheck::unchanged(current));
        }
    };

    let fetched = match fetcher.fetch_bytes(&url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("unable to check jnlp file for update because {}", e);
            return Ok(UpdateCheck::unchanged(current));
        }
    };

    if fetched == current {
        info!("jnlp file hasn't been changed");
        return Ok(UpdateCheck::unchanged(current));
    }

    info!("jnlp file has been changed");
    if let Err(e) = Descriptor::parse(&fetched) {
        warn!(
            "unable to parse new jnlp file because {}, existing copy will be used",
            e
        );
        return Ok(UpdateCheck::unchanged(current));
    }

    info!("jnlp file updated successfully");
    Ok(UpdateCheck {
        bytes: fetched,
        previous: Some(descriptor),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acquire::testing::FakeFetcher;

    const CURRENT: &str = r#"<jnlp codebase="http://example.com/app" href="app.jnlp">
  <information><title>Old Title</title></information>
  <application-desc main-class="Main"/>
</jnlp>"#;

    const NEWER: &str = r#"<jnlp codebase="http://example.com/app" href="app.jnlp">
  <information><title>New Title</title></information>
  <application-desc main-class="Main"/>
</jnlp>"#;

    #[tokio::test]
    async fn identical_remote_keeps_current() {
        let fetcher = FakeFetcher::new().with_body("app.jnlp", CURRENT);
        let check = check_for_update(&fetcher, CURRENT.as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(check.bytes, CURRENT.as_bytes());
        assert!(check.previous.is_none());
        assert_eq!(fetcher.requested(), vec!["http://example.com/app/app.jnlp"]);
    }

    #[tokio::test]
    async fn changed_remote_is_adopted() {
        let fetcher = FakeFetcher::new().with_body("app.jnlp", NEWER);
        let check = check_for_update(&fetcher, CURRENT.as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(check.bytes, NEWER.as_bytes());
        assert!(check.is_updated());
        assert_eq!(check.previous.unwrap().title(), "Old Title");
    }

    #[tokio::test]
    async fn unparsable_remote_keeps_last_known_good() {
        let fetcher = FakeFetcher::new().with_body("app.jnlp", "<html>maintenance</html>");
        let check = check_for_update(&fetcher, CURRENT.as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(check.bytes, CURRENT.as_bytes());
        assert!(check.previous.is_none());
    }

    #[tokio::test]
    async fn fetch_error_keeps_current() {
        let fetcher = FakeFetcher::new().failing("app.jnlp");
        let check = check_for_update(&fetcher, CURRENT.as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(check.bytes, CURRENT.as_bytes());
        assert!(!check.is_updated());
    }

    #[tokio::test]
    async fn no_self_reference_skips_the_check() {
        let doc = r#"<jnlp codebase="http://example.com/app"><application-desc main-class="M"/></jnlp>"#;
        let fetcher = FakeFetcher::new();
        let check = check_for_update(&fetcher, doc.as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(check.bytes, doc.as_bytes());
        assert!(fetcher.requested().is_empty());
    }
}

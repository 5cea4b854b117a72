mod client;

pub use client::{url_basename, url_stem, Downloader, Fetcher};

//! Network side of a cycle: reference data, pointer file, export archive.
//!
//! Stages run strictly in order, except the three reference loads which run
//! concurrently. Any failure aborts the whole cycle with one [`FeedError`].

use chrono::{DateTime, Utc};
use futures_util::future::try_join3;
use regex::Regex;
use reqwest::Client;
use std::io::{Cursor, Read};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{FeedConfig, ReferenceConfig};
use crate::data::Event;
use crate::parser::parse_events;
use crate::reference::{parse_boundaries, parse_cameo, parse_countries, ReferenceData};
use crate::schedule::archive_timestamp;

/// A fatal cycle error. `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{resource}の取得に失敗: {source}")]
    ReferenceFetch {
        resource: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{resource}の読み込みに失敗 ({location}): {source}")]
    ReferenceRead {
        resource: &'static str,
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{resource}の解析に失敗: {reason}")]
    ReferenceParse {
        resource: &'static str,
        reason: String,
    },
    #[error("更新情報ファイルの取得に失敗: {0}")]
    Pointer(#[source] reqwest::Error),
    #[error("更新情報ファイル内に有効なZIP URLが見つかりませんでした")]
    NoArchiveUrl,
    #[error("ZIPファイルのダウンロードに失敗: {0}")]
    Archive(#[source] reqwest::Error),
    #[error("ZIPファイルの展開に失敗: {0}")]
    Decompress(#[from] zip::result::ZipError),
    #[error("ZIPファイルの読み出しに失敗: {0}")]
    ArchiveRead(#[source] std::io::Error),
    #[error("ZIPファイル内にCSVファイルが見つかりませんでした")]
    EmptyArchive,
}

const CAMEO_RESOURCE: &str = "CAMEOコード定義ファイル";
const COUNTRY_RESOURCE: &str = "国コード定義ファイル";
const BOUNDARY_RESOURCE: &str = "国境データ(GeoJSON)";

/// Everything a successful fetch produced, before aggregation.
#[derive(Debug, Clone)]
pub struct CycleData {
    pub reference: ReferenceData,
    pub archive_url: String,
    /// Publication time from the archive's file name, when it has one.
    pub archive_time: Option<DateTime<Utc>>,
    pub events: Vec<Event>,
}

fn archive_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"http://[A-Za-z0-9.\-]+(?::\d+)?/gdeltv2/\d+\.translation\.export\.CSV\.zip")
            .expect("archive URL pattern is valid")
    })
}

/// First export archive URL mentioned in the pointer file.
pub fn extract_archive_url(pointer_text: &str) -> Option<&str> {
    archive_url_pattern().find(pointer_text).map(|m| m.as_str())
}

/// Text of the archive's first entry, whatever its name.
pub fn decompress_first_entry(bytes: &[u8]) -> Result<String, FeedError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    if archive.len() == 0 {
        return Err(FeedError::EmptyArchive);
    }
    let mut entry = archive.by_index(0)?;
    debug!(entry = entry.name(), size = entry.size(), "decompressing archive entry");

    // declared sizes are untrusted; let the buffer grow with what is read
    let mut raw = Vec::new();
    entry.read_to_end(&mut raw).map_err(FeedError::ArchiveRead)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

pub struct FeedClient {
    http: Client,
    feed: FeedConfig,
    reference: ReferenceConfig,
}

impl FeedClient {
    pub fn new(feed: FeedConfig, reference: ReferenceConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().user_agent(feed.user_agent.clone()).build()?;
        Ok(Self {
            http,
            feed,
            reference,
        })
    }

    /// Route a feed URL through the configured proxy, if any.
    pub fn proxied(&self, url: &str) -> String {
        match &self.feed.proxy_prefix {
            Some(prefix) => format!("{}{}", prefix, urlencoding::encode(url)),
            None => url.to_string(),
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, reqwest::Error> {
        self.http.get(url).send().await?.error_for_status()
    }

    async fn load_resource(&self, resource: &'static str, location: &str) -> Result<String, FeedError> {
        if is_remote(location) {
            let fetch = |source: reqwest::Error| FeedError::ReferenceFetch { resource, source };
            self.get(location).await.map_err(fetch)?.text().await.map_err(fetch)
        } else {
            tokio::fs::read_to_string(location)
                .await
                .map_err(|source| FeedError::ReferenceRead {
                    resource,
                    location: location.to_string(),
                    source,
                })
        }
    }

    /// CAMEO labels, country table and boundaries, loaded concurrently.
    pub async fn load_reference(&self) -> Result<ReferenceData, FeedError> {
        let (cameo, countries, boundaries) = try_join3(
            self.load_resource(CAMEO_RESOURCE, &self.reference.cameo_codes),
            self.load_resource(COUNTRY_RESOURCE, &self.reference.country_coordinates),
            self.load_resource(BOUNDARY_RESOURCE, &self.reference.boundaries),
        )
        .await?;

        let parse_failed = |resource, reason: String| FeedError::ReferenceParse { resource, reason };
        let data = ReferenceData {
            cameo: parse_cameo(&cameo).map_err(|e| parse_failed(CAMEO_RESOURCE, e.to_string()))?,
            countries: parse_countries(&countries)
                .map_err(|e| parse_failed(COUNTRY_RESOURCE, e.to_string()))?,
            boundaries: parse_boundaries(&boundaries)
                .map_err(|e| parse_failed(BOUNDARY_RESOURCE, e.to_string()))?,
        };
        debug!(
            cameo = data.cameo.len(),
            countries = data.countries.len(),
            boundaries = data.boundaries.len(),
            "reference data loaded"
        );
        Ok(data)
    }

    /// URL of the newest export archive, read from the pointer file.
    pub async fn fetch_archive_url(&self) -> Result<String, FeedError> {
        let text = self
            .get(&self.proxied(&self.feed.pointer_url))
            .await
            .map_err(FeedError::Pointer)?
            .text()
            .await
            .map_err(FeedError::Pointer)?;
        extract_archive_url(&text)
            .map(str::to_string)
            .ok_or(FeedError::NoArchiveUrl)
    }

    pub async fn fetch_archive(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let bytes = self
            .get(&self.proxied(url))
            .await
            .map_err(FeedError::Archive)?
            .bytes()
            .await
            .map_err(FeedError::Archive)?;
        Ok(bytes.to_vec())
    }

    /// Run every network stage of one cycle and parse the result.
    pub async fn fetch_cycle(&self) -> Result<CycleData, FeedError> {
        info!("loading reference data");
        let reference = self.load_reference().await?;

        info!(pointer = %self.feed.pointer_url, "fetching update pointer");
        let archive_url = self.fetch_archive_url().await?;

        info!(url = %archive_url, "downloading archive");
        let bytes = self.fetch_archive(&archive_url).await?;

        info!(bytes = bytes.len(), "decompressing archive");
        let text = decompress_first_entry(&bytes)?;

        let events = parse_events(&text);
        info!(events = events.len(), "parsed export");

        Ok(CycleData {
            reference,
            archive_time: archive_timestamp(&archive_url),
            archive_url,
            events,
        })
    }
}

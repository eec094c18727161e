//! reqwest adapter for the origin product API

use crate::catalog::CatalogError;
use crate::origin::OriginFetcher;
use carview_model::{
    Category, CategoryId, Manufacturer, ManufacturerId, VehicleId, VehicleRecord, decode_list,
    decode_one,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Origin fetcher talking JSON over HTTP
///
/// Endpoints are resolved relative to `base`: `models`, `models/{id}`,
/// `manufacturers`, `manufacturers/{id}`, `categories`, `categories/{id}`.
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: Client,
    base: Url,
    media: Option<Url>,
}

impl HttpOrigin {
    pub fn new(base_url: &str, media_url: Option<&str>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        let media = media_url
            .filter(|m| !m.is_empty())
            .map(directory_url)
            .transpose()?;

        Ok(Self {
            client,
            base: directory_url(base_url)?,
            media,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        self.base
            .join(path)
            .map_err(|e| CatalogError::InvalidUrl(format!("{}{}: {}", self.base, path, e)))
    }

    /// Absolute image URL for an origin image name
    pub fn image_url(&self, image: &str) -> String {
        let Some(media) = &self.media else {
            return image.to_string();
        };
        if image.is_empty() {
            return String::new();
        }

        match media.join(image) {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!("Could not resolve image {:?} against {}: {}", image, media, e);
                image.to_string()
            }
        }
    }

    /// GET `path` and return the body, or `None` on 404
    async fn get_bytes(&self, path: &str) -> Result<Option<Vec<u8>>, CatalogError> {
        let url = self.endpoint(path)?;
        debug!("📡 GET {}", url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, CatalogError> {
        match self.get_bytes(path).await? {
            Some(body) => Ok(decode_list(&body)?),
            // A list endpoint that is missing is a broken origin, not a miss
            None => Err(CatalogError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                url: self.endpoint(path)?.to_string(),
            }),
        }
    }

    async fn get_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, CatalogError> {
        match self.get_bytes(path).await? {
            Some(body) => Ok(Some(decode_one(&body)?)),
            None => Ok(None),
        }
    }

    fn with_image_url(&self, mut record: VehicleRecord) -> VehicleRecord {
        record.image = self.image_url(&record.image);
        record
    }
}

// `Url::join` replaces the last path segment unless the base ends in '/'
fn directory_url(raw: &str) -> Result<Url, CatalogError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", raw, e)))
}

#[async_trait::async_trait]
impl OriginFetcher for HttpOrigin {
    async fn fetch_vehicles(&self) -> Result<Vec<VehicleRecord>, CatalogError> {
        let records: Vec<VehicleRecord> = self.get_list("models").await?;
        Ok(records.into_iter().map(|r| self.with_image_url(r)).collect())
    }

    async fn fetch_manufacturers(&self) -> Result<Vec<Manufacturer>, CatalogError> {
        self.get_list("manufacturers").await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.get_list("categories").await
    }

    async fn fetch_vehicle(&self, id: VehicleId) -> Result<VehicleRecord, CatalogError> {
        self.get_one(&format!("models/{}", id))
            .await?
            .map(|r| self.with_image_url(r))
            .ok_or(CatalogError::NotFound(id))
    }

    async fn fetch_manufacturer(&self, id: ManufacturerId) -> Result<Option<Manufacturer>, CatalogError> {
        self.get_one(&format!("manufacturers/{}", id)).await
    }

    async fn fetch_category(&self, id: CategoryId) -> Result<Option<Category>, CatalogError> {
        self.get_one(&format!("categories/{}", id)).await
    }
}

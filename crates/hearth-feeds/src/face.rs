use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{FeedClient, FeedError};

/// An uploaded image, forwarded as the `img` multipart field.
#[derive(Debug, Clone)]
pub struct FaceImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FaceImage {
    fn into_part(self) -> Part {
        Part::bytes(self.bytes).file_name(self.file_name)
    }
}

#[derive(Debug, Deserialize)]
struct EncodeResponse {
    face_encoding: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    is_match: Option<bool>,
    error: Option<String>,
}

impl FeedClient {
    /// Turn an image into an opaque face encoding.
    pub async fn encode_face(&self, image: FaceImage) -> Result<String, FeedError> {
        let url = self.face_url("img2encoding");
        let form = Form::new().part("img", image.into_part());

        let body: EncodeResponse = self.post_form(&url, form).await?;
        match (body.face_encoding, body.error) {
            (Some(encoding), _) => Ok(encoding),
            (None, Some(err)) => Err(FeedError::Service(err)),
            (None, None) => Err(FeedError::UnexpectedShape(format!("{}: no face_encoding", url))),
        }
    }

    /// Ask the service whether the image matches any of `encodings`.
    pub async fn verify_face(
        &self,
        image: FaceImage,
        encodings: &[String],
    ) -> Result<bool, FeedError> {
        let url = self.face_url("verify");
        let mut form = Form::new().part("img", image.into_part());
        for encoding in encodings {
            form = form.text("encoding_array", encoding.clone());
        }

        let body: VerifyResponse = self.post_form(&url, form).await?;
        match (body.is_match, body.error) {
            (Some(is_match), _) => Ok(is_match),
            (None, Some(err)) => Err(FeedError::Service(err)),
            (None, None) => Err(FeedError::UnexpectedShape(format!("{}: no is_match", url))),
        }
    }

    fn face_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.face_service_url.trim_end_matches('/'), endpoint)
    }

    // The service reports "no face found" with a JSON error body, sometimes
    // under a non-2xx status, so the body is parsed regardless of status.
    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        form: Form,
    ) -> Result<T, FeedError> {
        let resp = self.http.post(url).multipart(form).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        serde_json::from_slice(&body).map_err(|e| {
            warn!("face service {} answered {} with unparsable body: {}", url, status, e);
            if status.is_success() {
                FeedError::UnexpectedShape(format!("{}: {}", url, e))
            } else {
                FeedError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                }
            }
        })
        .inspect(|_| debug!("face service {} answered {}", url, status))
    }
}

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use sa_core::AnalysisRequest;
use crate::ApiError;

/// Submission fields read from either `application/x-www-form-urlencoded`
/// or `multipart/form-data`. Any other body is rejected.
#[derive(Debug, Clone)]
pub struct AnalysisForm(pub AnalysisRequest);

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for AnalysisForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Form(request) = Form::<AnalysisRequest>::from_request(req, state).await?;
            return Ok(Self(request));
        }

        let mut multipart = Multipart::from_request(req, state).await?;
        let mut request = AnalysisRequest::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            let value = field.text().await?;
            match name.as_deref() {
                Some("file_uri") => request.file_uri = Some(value),
                Some("language_code") => request.language_code = Some(value),
                _ => {}
            }
        }
        Ok(Self(request))
    }
}

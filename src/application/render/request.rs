use axum::http::{HeaderName, Method, Request, StatusCode, request::Parts};
use serde::Serialize;
use tera::Context;

/// Read access to the inbound request.
pub trait RequestView {
    fn method(&self) -> &Method;
    fn path(&self) -> &str;
    /// Raw query string without the leading `?`; empty when absent.
    fn raw_query(&self) -> &str;
    /// First value of the named header, if present and valid UTF-8.
    fn header(&self, name: &HeaderName) -> Option<&str>;
}

impl<B> RequestView for Request<B> {
    fn method(&self) -> &Method {
        Request::method(self)
    }

    fn path(&self) -> &str {
        self.uri().path()
    }

    fn raw_query(&self) -> &str {
        self.uri().query().unwrap_or("")
    }

    fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers().get(name).and_then(|value| value.to_str().ok())
    }
}

impl RequestView for Parts {
    fn method(&self) -> &Method {
        &self.method
    }

    fn path(&self) -> &str {
        self.uri.path()
    }

    fn raw_query(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// What to render: status, template name and data.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub status: StatusCode,
    pub template: String,
    pub context: Context,
}

impl RenderRequest {
    /// Render `template` with empty data and a 200 status.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            template: template.into(),
            context: Context::new(),
        }
    }

    /// Render `template` with `data` serialized into the template context.
    pub fn with_data<T: Serialize>(
        template: impl Into<String>,
        data: &T,
    ) -> Result<Self, tera::Error> {
        Ok(Self::new(template).with_context(Context::from_serialize(data)?))
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }
}

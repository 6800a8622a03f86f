//! Transport-level response metadata

/// A typed upstream value together with the response it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    /// The decoded entity
    pub value: T,
    /// HTTP status code of the response
    pub status: u16,
    /// Raw response body, kept so callers can report unexpected statuses
    pub body: String,
}

impl<T> Response<T> {
    /// A `200 OK` response with an empty raw body.
    pub fn ok(value: T) -> Self {
        Self::with_status(value, 200)
    }

    /// A `201 Created` response with an empty raw body.
    pub fn created(value: T) -> Self {
        Self::with_status(value, 201)
    }

    pub fn with_status(value: T, status: u16) -> Self {
        Self {
            value,
            status,
            body: String::new(),
        }
    }

    /// Attach the raw body the value was decoded from.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// One or more required fields are missing or malformed
    #[error("{0}")]
    Validation(String),

    /// Email (or other unique field) already registered
    #[error("{0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport failure or malformed response from a remote service
    #[error("Network error: {0}")]
    Network(String),

    /// Device position unavailable or denied
    #[error("Permission error: {0}")]
    Permission(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Messaging error: {0}")]
    Messaging(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Recover the typed error carried by an `anyhow::Error`
    pub fn from_anyhow(err: anyhow::Error) -> Error {
        match err.downcast::<Error>() {
            Ok(err) => err,
            Err(other) => Error::Internal(other.to_string()),
        }
    }

    /// Stable machine-readable name of the variant, carried in API error replies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Duplicate(_) => "duplicate",
            Error::NotFound(_) => "not_found",
            Error::Network(_) => "network",
            Error::Permission(_) => "permission",
            Error::Authentication(_) => "authentication",
            Error::Config(_) => "config",
            Error::Database(_) => "database",
            Error::Messaging(_) => "messaging",
            Error::Cancelled(_) => "cancelled",
            Error::Internal(_) => "internal",
        }
    }

    /// Rebuild an error from its kind and message. Unknown kinds are internal.
    pub fn from_kind(kind: &str, message: String) -> Error {
        match kind {
            "validation" => Error::Validation(message),
            "duplicate" => Error::Duplicate(message),
            "not_found" => Error::NotFound(message),
            "network" => Error::Network(message),
            "permission" => Error::Permission(message),
            "authentication" => Error::Authentication(message),
            "config" => Error::Config(message),
            "database" => Error::Database(message),
            "messaging" => Error::Messaging(message),
            "cancelled" => Error::Cancelled(message),
            _ => Error::Internal(message),
        }
    }

    /// Message safe to show an end user. Server-side faults collapse into a
    /// generic retry prompt.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) | Error::Duplicate(msg) | Error::NotFound(msg) => msg.clone(),
            Error::Authentication(_) => self.to_string(),
            Error::Network(_) => "Network request failed. Please try again.".to_string(),
            Error::Permission(_) => {
                "Unable to get your location. Please enable location access.".to_string()
            }
            Error::Cancelled(_) => "Search was superseded by a newer one.".to_string(),
            Error::Config(_) | Error::Database(_) | Error::Messaging(_) | Error::Internal(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_faults_hide_details() {
        let err = Error::Database("connection refused on 10.0.0.5".to_string());
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
        assert_eq!(
            Error::Validation("Name is required".to_string()).user_message(),
            "Name is required"
        );
    }

    #[test]
    fn kind_names_round_trip() {
        let duplicate = Error::Duplicate("This email is already registered".to_string());
        assert_eq!(duplicate.kind(), "duplicate");
        assert_eq!(
            Error::from_kind(duplicate.kind(), "This email is already registered".to_string()),
            duplicate
        );
        assert!(matches!(
            Error::from_kind("something-new", "x".to_string()),
            Error::Internal(_)
        ));
    }

    #[test]
    fn anyhow_round_trip_keeps_variant() {
        let wrapped: anyhow::Error = Error::Duplicate("taken".to_string()).into();
        assert_eq!(Error::from_anyhow(wrapped), Error::Duplicate("taken".to_string()));

        let foreign = anyhow::anyhow!("boom");
        assert!(matches!(Error::from_anyhow(foreign), Error::Internal(_)));
    }
}

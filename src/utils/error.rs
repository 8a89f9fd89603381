//! Customized unified error type.

use std::error;
use std::fmt;
use std::io;
use std::net;
use std::string;

/// Customized error type for Tribstore.
///
/// Validation failures of the front-end are typed so that callers can react
/// to them; everything coming from transport, codecs or remote backends is
/// carried uninterpreted as a message.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TribError {
    /// Invalid or unusable configuration.
    Config(String),

    /// Username fails the format rules.
    InvalidUsername(String),

    /// Username already registered.
    UsernameTaken(String),

    /// User has not signed up.
    UserNotFound(String),

    /// Post with empty text.
    EmptyPost,

    /// Post text longer than the configured limit.
    TribTooLong,

    /// Follow-related operation naming the same user twice.
    WhoWhom(String),

    /// `who` already follows `whom`.
    AlreadyFollowing(String, String),

    /// `who` does not follow `whom`.
    NotFollowing(String, String),

    /// `who` has reached the followee limit.
    FollowingTooMany,

    /// Bin requested with an empty name.
    EmptyBinName,

    /// Bin name containing the bin separator.
    InvalidBinName(String),

    /// Any other error, including transport and remote errors.
    Msg(String),
}

impl TribError {
    pub fn msg(msg: impl ToString) -> Self {
        TribError::Msg(msg.to_string())
    }
}

impl fmt::Display for TribError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TribError::Config(s) => write!(f, "invalid config: {}", s),
            TribError::InvalidUsername(u) => {
                write!(f, "invalid username {:?}", u)
            }
            TribError::UsernameTaken(u) => {
                write!(f, "username {:?} already taken", u)
            }
            TribError::UserNotFound(u) => write!(f, "user {:?} not found", u),
            TribError::EmptyPost => write!(f, "trib must not be empty"),
            TribError::TribTooLong => write!(f, "trib too long"),
            TribError::WhoWhom(u) => {
                write!(f, "cannot follow or unfollow oneself ({:?})", u)
            }
            TribError::AlreadyFollowing(who, whom) => {
                write!(f, "{:?} is already following {:?}", who, whom)
            }
            TribError::NotFollowing(who, whom) => {
                write!(f, "{:?} is not following {:?}", who, whom)
            }
            TribError::FollowingTooMany => {
                write!(f, "following too many people")
            }
            TribError::EmptyBinName => write!(f, "bin name must not be empty"),
            TribError::InvalidBinName(b) => {
                write!(f, "invalid bin name {:?}", b)
            }
            TribError::Msg(s) => write!(f, "{}", s), // do not display literal quotes
        }
    }
}

impl error::Error for TribError {}

// Helper macro for saving boiler-plate `impl From<X>`s for transparent
// conversion from various common error types to `TribError`.
macro_rules! impl_from_error {
    ($error:ty) => {
        impl From<$error> for TribError {
            fn from(e: $error) -> Self {
                // just store the source error's string representation
                TribError::Msg(e.to_string())
            }
        }
    };
}

// Helper macro for saving boiler-plate `impl From<X<T>>`s for transparent
// conversion from various common generic error types to `TribError`.
macro_rules! impl_from_error_generic {
    ($error:ty) => {
        impl<T> From<$error> for TribError {
            fn from(e: $error) -> TribError {
                TribError::msg(e.to_string())
            }
        }
    };
}

impl_from_error!(io::Error);
impl_from_error!(string::FromUtf8Error);
impl_from_error!(net::AddrParseError);
impl_from_error!(rmp_serde::encode::Error);
impl_from_error!(rmp_serde::decode::Error);
impl_from_error!(serde_json::Error);
impl_from_error!(toml::ser::Error);
impl_from_error!(toml::de::Error);
impl_from_error!(ctrlc::Error);

impl_from_error_generic!(tokio::sync::watch::error::SendError<T>);
impl_from_error_generic!(tokio::sync::mpsc::error::SendError<T>);

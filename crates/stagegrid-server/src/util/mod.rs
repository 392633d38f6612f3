use crate::handler::error::ApiError;

pub fn required_str(s: &str, msg: &'static str) -> Result<(), ApiError> {
    if s.trim().is_empty() {
        Err(ApiError::validation(msg))
    } else {
        Ok(())
    }
}

/// Non-empty string of at most `max` characters.
pub fn bounded_str(s: &str, max: usize, msg: &'static str) -> Result<(), ApiError> {
    required_str(s, msg)?;
    if s.chars().count() > max {
        Err(ApiError::validation(msg))
    } else {
        Ok(())
    }
}

macro_rules! inner_api_required {
    ($opt:expr) => {
        match $opt {
            std::option::Option::Some(value) => std::result::Result::Ok(value),
            std::option::Option::None => std::result::Result::Err(
                $crate::handler::error::ApiError::validation(format!(
                    "Required field '{}' missing",
                    stringify!($opt)
                )),
            ),
        }
    };
    ($opt:expr, $msg:expr) => {
        match $opt {
            std::option::Option::Some(value) => std::result::Result::Ok(value),
            std::option::Option::None => {
                std::result::Result::Err($crate::handler::error::ApiError::validation($msg))
            }
        }
    };
}
pub(crate) use inner_api_required as api_required;

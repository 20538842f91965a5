//! Decoding of the environment-variables blob.
//!
//! The front end sends extra application environment variables as one
//! header: base64 of `KEY\0VALUE\0KEY\0VALUE\0...`. The blob is cached
//! verbatim in the options; spawners decode it with [`decode_env_vars`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Errors from decoding the environment-variables blob.
#[derive(Debug, Error)]
pub enum EnvVarsError {
    #[error("environment variables blob is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("environment variable {0} has no value")]
    MissingValue(String),

    #[error("environment variables blob is not valid UTF-8")]
    Utf8,
}

/// Decode `blob` into ordered key/value pairs. An empty blob yields none.
pub fn decode_env_vars(blob: &str) -> Result<Vec<(String, String)>, EnvVarsError> {
    if blob.is_empty() {
        return Ok(Vec::new());
    }

    let raw = STANDARD.decode(blob.trim())?;
    let text = String::from_utf8(raw).map_err(|_| EnvVarsError::Utf8)?;

    let mut parts = text.split('\0');
    let mut pairs = Vec::new();
    while let Some(key) = parts.next() {
        if key.is_empty() {
            break;
        }
        let value = parts
            .next()
            .ok_or_else(|| EnvVarsError::MissingValue(key.to_string()))?;
        pairs.push((key.to_string(), value.to_string()));
    }
    Ok(pairs)
}

/// Encode pairs into the wire format. Used by tests and tooling.
pub fn encode_env_vars<'p, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'p str, &'p str)>,
{
    let mut raw = String::new();
    for (key, value) in pairs {
        raw.push_str(key);
        raw.push('\0');
        raw.push_str(value);
        raw.push('\0');
    }
    STANDARD.encode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pairs() {
        let blob = encode_env_vars([("RAILS_ENV", "staging"), ("EMPTY", "")]);
        let pairs = decode_env_vars(&blob).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("RAILS_ENV".to_string(), "staging".to_string()),
                ("EMPTY".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_empty_blob() {
        assert!(decode_env_vars("").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(decode_env_vars("%%%"), Err(EnvVarsError::Base64(_))));
    }

    #[test]
    fn test_key_without_value() {
        let blob = STANDARD.encode("KEY");
        assert!(matches!(
            decode_env_vars(&blob),
            Err(EnvVarsError::MissingValue(key)) if key == "KEY"
        ));
    }
}

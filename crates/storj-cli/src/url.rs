//! `sj://bucket/path` URL parsing (§6 "Bucket URLs use scheme `sj://`").

use crate::error::CliError;

const SCHEME: &str = "sj://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SjUrl {
    pub bucket: String,
    pub path: String,
}

impl SjUrl {
    /// Parse a bucket-only URL (`mb`/`rb`): `sj://bucket` or `sj://bucket/`.
    pub fn parse_bucket(raw: &str) -> Result<Self, CliError> {
        let rest = strip_scheme(raw)?;
        let bucket = rest.trim_end_matches('/');
        if bucket.is_empty() || bucket.contains('/') {
            return Err(CliError::Usage(format!(
                "expected sj://bucket, got {raw:?}"
            )));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            path: String::new(),
        })
    }

    /// Parse an object URL (`cat`/`rm`/`cp`): `sj://bucket/path`, path required.
    pub fn parse_object(raw: &str) -> Result<Self, CliError> {
        let rest = strip_scheme(raw)?;
        let (bucket, path) = rest.split_once('/').ok_or_else(|| {
            CliError::Usage(format!(
                "No bucket specified, use format sj://bucket/path (got {raw:?})"
            ))
        })?;
        if bucket.is_empty() {
            return Err(CliError::Usage(
                "No bucket specified, use format sj://bucket/path".to_string(),
            ));
        }
        if path.is_empty() {
            return Err(CliError::Usage(format!(
                "expected an object path after the bucket in {raw:?}"
            )));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            path: path.to_string(),
        })
    }

    /// Parse an `ls` target: `sj://bucket[/prefix]`, prefix optional.
    pub fn parse_listing(raw: &str) -> Result<Self, CliError> {
        let rest = strip_scheme(raw)?;
        match rest.split_once('/') {
            Some((bucket, prefix)) => {
                if bucket.is_empty() {
                    return Err(CliError::Usage(
                        "No bucket specified, use format sj://bucket/prefix".to_string(),
                    ));
                }
                Ok(Self {
                    bucket: bucket.to_string(),
                    path: prefix.to_string(),
                })
            }
            None => {
                if rest.is_empty() {
                    return Err(CliError::Usage(
                        "No bucket specified, use format sj://bucket".to_string(),
                    ));
                }
                Ok(Self {
                    bucket: rest.to_string(),
                    path: String::new(),
                })
            }
        }
    }
}

fn strip_scheme(raw: &str) -> Result<&str, CliError> {
    raw.strip_prefix(SCHEME)
        .ok_or_else(|| CliError::Usage(format!("expected an sj:// URL, got {raw:?}")))
}

/// Is `-` standing in for standard input/output (§6 "`-` denotes standard streams")?
pub fn is_stdio(raw: &str) -> bool {
    raw == "-"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_url_strips_trailing_slash() {
        assert_eq!(
            SjUrl::parse_bucket("sj://photos/").unwrap(),
            SjUrl {
                bucket: "photos".to_string(),
                path: String::new()
            }
        );
    }

    #[test]
    fn object_url_requires_a_path() {
        assert!(SjUrl::parse_object("sj://photos").is_err());
        assert!(SjUrl::parse_object("sj://photos/").is_err());
        let url = SjUrl::parse_object("sj://photos/a/b.jpg").unwrap();
        assert_eq!(url.bucket, "photos");
        assert_eq!(url.path, "a/b.jpg");
    }

    #[test]
    fn listing_url_allows_a_bare_bucket() {
        let url = SjUrl::parse_listing("sj://photos").unwrap();
        assert_eq!(url.bucket, "photos");
        assert_eq!(url.path, "");

        let url = SjUrl::parse_listing("sj://photos/vacation").unwrap();
        assert_eq!(url.path, "vacation");
    }

    #[test]
    fn non_sj_scheme_is_rejected() {
        assert!(SjUrl::parse_bucket("s3://photos").is_err());
    }
}

//! The six sub-commands of §6: `mb`, `rb`, `cp`, `cat`, `ls`, `rm`.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use storj_metainfo::MetainfoError;

use crate::error::CliError;
use crate::url::{is_stdio, SjUrl};
use crate::workspace::Workspace;

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// Usage-vs-internal classification for the exit-code contract of §6.
fn map_metainfo_err(err: MetainfoError) -> CliError {
    match err {
        MetainfoError::NoBucket
        | MetainfoError::NoPath
        | MetainfoError::InvalidArgument(_) => CliError::Usage(err.to_string()),
        MetainfoError::BucketNotFound(name) => CliError::Usage(format!("Bucket not found: {name}")),
        MetainfoError::BucketExists(name) => CliError::Usage(format!("Bucket already exists: {name}")),
        MetainfoError::ObjectNotFound(path) => CliError::Usage(format!("Object not found: {path}")),
        other => CliError::Other(anyhow::anyhow!(other)),
    }
}

pub async fn mb(ws: &Workspace, raw_url: &str) -> Result<(), CliError> {
    let url = SjUrl::parse_bucket(raw_url)?;
    ws.metainfo
        .create_bucket(&url.bucket, ws.cipher, now_unix())
        .await
        .map_err(map_metainfo_err)
}

pub async fn rb(ws: &Workspace, raw_url: &str) -> Result<(), CliError> {
    let url = SjUrl::parse_bucket(raw_url)?;
    ws.metainfo.delete_bucket(&url.bucket).await.map_err(map_metainfo_err)
}

pub async fn cp(ws: &Workspace, src: &str, dst: &str) -> Result<(), CliError> {
    let data = read_source(ws, src).await?;
    write_destination(ws, dst, &data).await
}

pub async fn cat(ws: &Workspace, raw_url: &str) -> Result<(), CliError> {
    let url = SjUrl::parse_object(raw_url)?;
    let (data, _meta) = ws.metainfo.get_object(&url.bucket, &url.path).await.map_err(map_metainfo_err)?;
    std::io::stdout()
        .write_all(&data)
        .map_err(|e| CliError::Other(anyhow::anyhow!(e)))
}

pub async fn rm(ws: &Workspace, raw_url: &str) -> Result<(), CliError> {
    let url = SjUrl::parse_object(raw_url)?;
    ws.metainfo.delete_object(&url.bucket, &url.path).await.map_err(map_metainfo_err)
}

pub async fn ls(ws: &Workspace, raw_url: &str) -> Result<Vec<String>, CliError> {
    let url = SjUrl::parse_listing(raw_url)?;
    let (names, _more) = ws
        .metainfo
        .list_objects(&url.bucket, "", storj_kv::Direction::Forward, 0, true)
        .await
        .map_err(map_metainfo_err)?;

    if url.path.is_empty() {
        return Ok(top_level(&names));
    }
    let prefix = format!("{}/", url.path.trim_end_matches('/'));
    let scoped: Vec<String> = names
        .into_iter()
        .filter(|name| name.starts_with(&prefix))
        .map(|name| name[prefix.len()..].to_string())
        .collect();
    Ok(top_level(&scoped))
}

/// Roll entries up to their first path component, matching a non-recursive
/// `ls` within whatever prefix the caller already scoped `names` to.
fn top_level(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    for name in names {
        match name.split_once('/') {
            Some((dir, _)) => {
                seen.insert(format!("{dir}/"));
            }
            None => {
                seen.insert(name.clone());
            }
        }
    }
    seen.into_iter().collect()
}

async fn read_source(ws: &Workspace, src: &str) -> Result<Vec<u8>, CliError> {
    if let Some(stripped) = src.strip_prefix("sj://") {
        let url = SjUrl::parse_object(&format!("sj://{stripped}"))?;
        let (data, _meta) = ws.metainfo.get_object(&url.bucket, &url.path).await.map_err(map_metainfo_err)?;
        Ok(data)
    } else if is_stdio(src) {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| CliError::Other(anyhow::anyhow!(e)))?;
        Ok(buf)
    } else {
        std::fs::read(src).map_err(|e| CliError::Other(anyhow::anyhow!("reading {src}: {e}")))
    }
}

async fn write_destination(ws: &Workspace, dst: &str, data: &[u8]) -> Result<(), CliError> {
    if let Some(stripped) = dst.strip_prefix("sj://") {
        let url = SjUrl::parse_object(&format!("sj://{stripped}"))?;
        ws.metainfo
            .create_object(&url.bucket, &url.path, data, ws.redundancy, now_unix(), 0, Vec::new(), &HashSet::new())
            .await
            .map_err(map_metainfo_err)
    } else if is_stdio(dst) {
        std::io::stdout()
            .write_all(data)
            .map_err(|e| CliError::Other(anyhow::anyhow!(e)))
    } else {
        std::fs::write(dst, data).map_err(|e| CliError::Other(anyhow::anyhow!("writing {dst}: {e}")))
    }
}

use alttext_core::api::{ApiError, BatchRequest, BatchResponse, RunSummary, SelectionRequest, SelectionResponse};
use alttext_core::models::{AssetId, BatchCursor, RunId};
use alttext_core::pipeline::Engine;
use anyhow::{anyhow, Result};

/// Parses a comma-separated id list. Anything that is not a positive integer
/// is rejected before the catalog is touched.
pub fn parse_ids(list: &str) -> Result<Vec<AssetId>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<AssetId>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(anyhow!("invalid asset id: {s}")),
        })
        .collect()
}

/// One batch call starting at `offset`. Pass the `run` of the previous
/// response to continue that run.
pub async fn run_once(
    engine: &Engine,
    token: &str,
    offset: i64,
    run: Option<RunId>,
) -> Result<BatchResponse, ApiError> {
    engine
        .api
        .bulk_run(BatchRequest {
            offset,
            run,
            auth_token: token.to_string(),
        })
        .await
}

/// Keeps calling until the scan reports no more pages. Progress lines go to
/// stdout unless `json` output was requested.
pub async fn run_all(engine: &Engine, token: &str, start: BatchCursor, json: bool) -> Result<RunSummary, ApiError> {
    let mut processed = 0usize;
    let mut skipped = 0usize;
    engine
        .api
        .run_to_completion(token, start, |resp| {
            processed += resp.processed;
            skipped += resp.skipped;
            if !json {
                println!(
                    "offset {}: fetched {}, processed {}, skipped {} | total processed {}, skipped {}",
                    resp.offset, resp.count, resp.processed, resp.skipped, processed, skipped
                );
            }
        })
        .await
}

pub async fn select(engine: &Engine, token: &str, ids: Vec<AssetId>) -> Result<SelectionResponse, ApiError> {
    engine
        .api
        .bulk_select(SelectionRequest {
            asset_ids: ids,
            auth_token: token.to_string(),
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::parse_ids;

    #[test]
    fn ids_parse() {
        assert_eq!(parse_ids("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_ids("").unwrap(), Vec::<i64>::new());
        assert!(parse_ids("1,x").is_err());
        assert!(parse_ids("0").is_err());
        assert!(parse_ids("-4").is_err());
    }
}

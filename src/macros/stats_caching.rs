/// check if a statistics response is in the cache, if it is, return it.
/// else follow the normal flow. a cache entry that fails to deserialize
/// falls through to recomputation.
///
/// does nothing when debug enabled
macro_rules! read_cache_stats {
    ( $key:expr ) => {
        if !cfg!(debug_assertions) {
            match &mut Redis::connect() {
                Ok(r_conn) => {
                    if Redis::has_data::<String>(r_conn, $key.to_string()).unwrap_or(false) {
                        if let Ok(data) = Redis::get_data::<String, String>(r_conn, $key.to_string()) {
                            if let Ok(cached) = serde_json::from_str(&data) {
                                return Ok(cached);
                            }
                        }
                    }
                }
                Err(error) => {
                    warn!(target:"macros/stats_caching:read", "Error connecting to redis: {}", error);
                }
            }
        }
    };
}

/// add the computed statistics response to the cache and return it.
/// cache failures are logged and never fail the call.
///
/// if debug is enabled we wont add to cache.
macro_rules! cache_stats {
    ( $key:expr, $data:expr ) => {{
        if !cfg!(debug_assertions) {
            match &mut Redis::connect() {
                Ok(r_conn) => {
                    if let Ok(serialized) = serde_json::to_string(&$data) {
                        let _ = Redis::set_data::<String, String>(r_conn, $key.to_string(), serialized);
                    }
                }
                Err(error) => {
                    warn!(target:"macros/stats_caching:write", "Error connecting to redis: {}", error);
                }
            }
        }

        return Ok($data);
    }};
}

pub(crate) use cache_stats;
pub(crate) use read_cache_stats;

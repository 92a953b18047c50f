use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn, Pat};

/// Time a function when the `perf_stats` feature is enabled.
///
/// The function body is wrapped with a drop guard that logs the elapsed time
/// through `tracing::info!` when it exceeds the threshold. Without the
/// `perf_stats` feature the guard is compiled out entirely.
///
/// # Features
/// - Auto-detects a `map: &str` parameter and includes the map name in the log line
/// - Default threshold is 1ms; pass a number to override it
///
/// # Example
/// ```ignore
/// #[profile]
/// pub fn find_path(&self, map: &str, start: Point, goal: Point) -> Result<Vec<Point>, NavError> {
///     // ... search ...
/// }
///
/// #[profile(25)] // only log calls slower than 25ms
/// pub fn process_maps(data: &GameData) -> Result<MapProcessor, DataError> { ... }
/// ```
#[proc_macro_attribute]
pub fn profile(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let threshold_ms: u128 = if attr.is_empty() {
        1
    } else {
        attr.to_string().trim().parse().unwrap_or(1)
    };

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;
    let fn_name_str = sig.ident.to_string();

    // A parameter literally named `map` is treated as the map being processed
    let has_map_param = sig.inputs.iter().any(|arg| {
        if let FnArg::Typed(pat_type) = arg {
            if let Pat::Ident(pat_ident) = &*pat_type.pat {
                return pat_ident.ident == "map";
            }
        }
        false
    });

    let profile_guard_def = if has_map_param {
        quote! {
            struct ProfileGuard {
                name: &'static str,
                map: String,
                start: std::time::Instant,
            }
            impl Drop for ProfileGuard {
                fn drop(&mut self) {
                    let elapsed = self.start.elapsed();
                    if elapsed.as_millis() > #threshold_ms {
                        tracing::info!("[PERF] {} (map={}): {:?}", self.name, self.map, elapsed);
                    }
                }
            }
            ProfileGuard {
                name: #fn_name_str,
                map: map.to_string(),
                start: std::time::Instant::now(),
            }
        }
    } else {
        quote! {
            struct ProfileGuard {
                name: &'static str,
                start: std::time::Instant,
            }
            impl Drop for ProfileGuard {
                fn drop(&mut self) {
                    let elapsed = self.start.elapsed();
                    if elapsed.as_millis() > #threshold_ms {
                        tracing::info!("[PERF] {}: {:?}", self.name, elapsed);
                    }
                }
            }
            ProfileGuard {
                name: #fn_name_str,
                start: std::time::Instant::now(),
            }
        }
    };

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            #[cfg(feature = "perf_stats")]
            let _profile_timer = {
                #profile_guard_def
            };

            #block
        }
    };

    output.into()
}

/// ERP Views - logical-table view engine for the ERP administration console
///
/// This is the root crate that provides workspace-level documentation.
/// Actual implementation is in the subcrates:
/// - `erp-views-core`: schema/record stores, filter and sort evaluators,
///   foreign key resolution, view registry and the table view engine
/// - `erp-views-client`: HTTP backend for the engine and the `erp-views` CLI

/// Returns the version of the package.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

use catalog_core::catalog::{CatalogParams, CatalogRequest};

use crate::cli::CatalogArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_catalogs;

pub(crate) async fn handle_catalogs(ctx: &AppContext, args: CatalogArgs) -> CliResult<()> {
    ctx.require_session()?;
    let request = build_request(&args)?;
    let catalogs = ctx.console.catalogs().fetch(&request).await?;
    render_catalogs(&catalogs, ctx.output)
}

fn build_request(args: &CatalogArgs) -> CliResult<CatalogRequest> {
    let mut request = CatalogRequest::new();
    for catalog in &args.types {
        let catalog = catalog.trim();
        if catalog.is_empty() {
            return Err(CliError::validation("catalog type must not be empty"));
        }
        request = request.with(
            catalog,
            CatalogParams {
                limit: args.limit,
                ..CatalogParams::default()
            },
        );
    }
    Ok(request)
}

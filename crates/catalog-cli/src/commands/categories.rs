use catalog_client::{ClientError, ListConfig, ListManager};
use catalog_client::categories::{CategoryApi, category_list_config};
use catalog_core::categories::CategoryFormValues;
use catalog_core::query::QueryFilter;
use catalog_core::report::ReportRequest;

use crate::cli::{
    CategoryCreateArgs, CategoryIdArgs, CategoryListArgs, CategoryReportArgs, CategoryUpdateArgs,
    StatusArg,
};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_category, render_category_page};

pub(crate) async fn handle_category_list(
    ctx: &AppContext,
    args: CategoryListArgs,
) -> CliResult<()> {
    ctx.require_session()?;
    let console = &ctx.console;
    let config = category_list_config(console.config().page_size);
    let list: ListManager<CategoryApi> = ListManager::new(
        console.categories(),
        console.category_store().clone(),
        ListConfig {
            auto_init: false,
            preserve_query_params: false,
            ..config
        },
    );

    if let Some(limit) = args.limit {
        if limit == 0 {
            return Err(CliError::validation("limit must be at least 1"));
        }
        list.set_page_size(limit);
    }
    if let Some(search) = &args.search {
        list.apply_search(search);
    }
    if let Some(sort) = args.sort {
        list.set_sort(sort.field, sort.direction);
    }
    if let Some(status) = args.status {
        let active = status == StatusArg::Active;
        list.add_filter(QueryFilter::eq("is_active", active));
    }
    if let Some(page) = args.page {
        list.set_page(page);
    }

    list.fetch(None).await?;
    let (rows, pagination) = list
        .store()
        .read(|store| (store.entities.clone(), store.pagination));
    render_category_page(&rows, &pagination, ctx.output)
}

pub(crate) async fn handle_category_show(ctx: &AppContext, args: CategoryIdArgs) -> CliResult<()> {
    ctx.require_session()?;
    let category = ctx.console.categories().fetch_one(&args.id).await?;
    render_category(&category, ctx.output)
}

pub(crate) async fn handle_category_create(
    ctx: &AppContext,
    args: CategoryCreateArgs,
) -> CliResult<()> {
    ctx.require_session()?;
    let form = ctx.console.category_form(None)?;
    form.set_values(CategoryFormValues {
        id: None,
        name: args.name,
        description: args.description,
        status: args.status.into(),
        color: args.color,
        display_order: args.display_order,
    });
    let category = form.save().await?;
    println!("Category created (id: {})", category.id);
    render_category(&category, ctx.output)
}

pub(crate) async fn handle_category_update(
    ctx: &AppContext,
    args: CategoryUpdateArgs,
) -> CliResult<()> {
    ctx.require_session()?;
    let existing = ctx.console.categories().fetch_one(&args.id).await?;
    let form = ctx.console.category_form(Some(existing))?;
    form.set_value(|values| {
        if let Some(name) = args.name {
            values.name = name;
        }
        if let Some(description) = args.description {
            values.description = description;
        }
        if let Some(status) = args.status {
            values.status = status.into();
        }
        if let Some(color) = args.color {
            values.color = color;
        }
        if let Some(display_order) = args.display_order {
            values.display_order = display_order;
        }
    });
    let category = form.update().await?;
    println!("Category updated (id: {})", category.id);
    render_category(&category, ctx.output)
}

pub(crate) async fn handle_category_delete(ctx: &AppContext, args: CategoryIdArgs) -> CliResult<()> {
    ctx.require_session()?;
    let id = ctx.console.category_form(None)?.delete(&args.id).await?;
    println!("Category deleted (id: {id})");
    Ok(())
}

pub(crate) async fn handle_category_restore(
    ctx: &AppContext,
    args: CategoryIdArgs,
) -> CliResult<()> {
    ctx.require_session()?;
    let category = ctx.console.category_form(None)?.restore(&args.id).await?;
    println!("Category restored (id: {})", category.id);
    render_category(&category, ctx.output)
}

pub(crate) async fn handle_category_report(
    ctx: &AppContext,
    args: CategoryReportArgs,
) -> CliResult<()> {
    ctx.require_session()?;
    let request = ReportRequest {
        title: args.title,
        ..ReportRequest::default()
    }
    .param("report", "categories");
    let report = ctx.console.categories().report(&request).await?;
    let path = report
        .write_to(&args.dir)
        .map_err(ClientError::from)?;
    println!("Report written to {}", path.display());
    Ok(())
}

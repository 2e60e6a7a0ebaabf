//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use catalog_core::categories::Category;
use catalog_core::catalog::CatalogResponse;
use catalog_core::{Pagination, SessionProfile};
use serde_json::{Value, json};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_category_page(
    categories: &[Category],
    pagination: &Pagination,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "data": categories.iter().map(category_json).collect::<Vec<_>>(),
            "pagination": {
                "page": pagination.page,
                "limit": pagination.limit,
                "total": pagination.total,
                "pages": pagination.pages,
                "from": pagination.from,
                "to": pagination.to,
            },
        })),
        OutputFormat::Table => {
            println!(
                "{:<12} {:<8} {:>5} {:<8} {:<17} NAME",
                "ID", "STATUS", "ORDER", "COLOR", "CREATED"
            );
            for category in categories {
                println!(
                    "{:<12} {:<8} {:>5} {:<8} {:<17} {}",
                    category.id,
                    category.status.as_str(),
                    category.display_order,
                    if category.color.is_empty() { "-" } else { &category.color },
                    format_created(category),
                    category.name
                );
            }
            println!("{}", page_summary(pagination));
            Ok(())
        }
    }
}

pub(crate) fn render_category(category: &Category, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&category_json(category)),
        OutputFormat::Table => {
            println!("id: {}", category.id);
            println!("name: {}", category.name);
            if !category.description.is_empty() {
                println!("description: {}", category.description);
            }
            println!("status: {}", category.status);
            if !category.color.is_empty() {
                println!("color: {}", category.color);
            }
            println!("display order: {}", category.display_order);
            println!("created: {}", format_created(category));
            if category.audit.is_deleted() {
                println!("deleted: yes");
            }
            Ok(())
        }
    }
}

pub(crate) fn render_catalogs(catalogs: &CatalogResponse, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(
            &serde_json::to_value(catalogs)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?,
        ),
        OutputFormat::Table => {
            for (catalog, items) in catalogs {
                println!("{catalog} ({})", items.len());
                for item in items {
                    println!("  {:<12} {}", item.id, item.name);
                }
            }
            Ok(())
        }
    }
}

pub(crate) fn render_profile(profile: &SessionProfile, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(
            &serde_json::to_value(profile)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?,
        ),
        OutputFormat::Table => {
            println!("id: {}", profile.user.id);
            println!("email: {}", profile.user.email);
            if let Some(name) = &profile.user.name {
                println!("name: {name}");
            }
            if !profile.roles.is_empty() {
                println!("roles: {}", profile.roles.join(", "));
            }
            println!("abilities: {}", profile.abilities.len());
            Ok(())
        }
    }
}

pub(crate) fn category_json(category: &Category) -> Value {
    json!({
        "id": category.id,
        "name": category.name,
        "description": category.description,
        "status": category.status,
        "color": if category.color.is_empty() { Value::Null } else { json!(category.color) },
        "display_order": category.display_order,
        "created_at": category.audit.created_at,
        "deleted_at": category.audit.deleted_at,
    })
}

/// One-line pagination summary, e.g. `page 2/3, rows 21-40 of 57`.
pub(crate) fn page_summary(pagination: &Pagination) -> String {
    match (pagination.from, pagination.to) {
        (Some(from), Some(to)) if pagination.total > 0 => format!(
            "page {}/{}, rows {from}-{to} of {}",
            pagination.page,
            pagination.pages.max(1),
            pagination.total
        ),
        _ => format!(
            "page {}/{}, no rows",
            pagination.page,
            pagination.pages.max(1)
        ),
    }
}

fn format_created(category: &Category) -> String {
    category
        .audit
        .created_at_utc()
        .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string())
}

fn print_json(value: &Value) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

//! Category resource binding: codec, list defaults, and CRUD messages.

use std::sync::Arc;

use catalog_core::categories::{
    CATEGORY_PATH, Category, CategoryFormValues, category_validators,
};
use catalog_core::query::{QuerySort, SortDirection};
use catalog_core::{CoreResult, Location, Notifier, SharedStore};
use serde_json::Value;

use crate::crud::{CrudConfig, CrudManager, CrudMessages, CrudMode};
use crate::error::ClientResult;
use crate::http::HttpClient;
use crate::list::{ListConfig, ListHooks, ListManager};
use crate::resource::{ResourceApi, ResourceCodec};

/// Category resource bound to `/category`.
pub type CategoryApi = ResourceApi<CategoryCodec>;

/// Maps category records and forms to the API shape.
#[derive(Clone, Copy, Debug, Default)]
pub struct CategoryCodec;

impl ResourceCodec for CategoryCodec {
    type Record = Category;
    type Form = CategoryFormValues;

    fn decode_record(&self, value: Value) -> CoreResult<Category> {
        Category::from_api(value)
    }

    fn encode_create(&self, form: &CategoryFormValues) -> Value {
        form.to_api(None)
    }

    fn encode_update(&self, form: &CategoryFormValues, existing: Option<&Category>) -> Value {
        form.to_api(existing)
    }
}

/// Category resource using `http`.
#[must_use]
pub fn category_api(http: HttpClient) -> CategoryApi {
    ResourceApi::new(http, CATEGORY_PATH, CategoryCodec)
}

/// Notification texts for category forms.
#[must_use]
pub fn category_messages() -> CrudMessages {
    CrudMessages {
        save_success: "Category created successfully".to_string(),
        save_error: "Failed to create category".to_string(),
        update_success: "Category updated successfully".to_string(),
        update_error: "Failed to update category".to_string(),
        delete_success: "Category deleted successfully".to_string(),
        delete_error: "Failed to delete category".to_string(),
        ..CrudMessages::default()
    }
}

/// List defaults for the category table: newest first, state kept in the URL.
#[must_use]
pub fn category_list_config(page_size: u32) -> ListConfig {
    ListConfig {
        preserve_query_params: true,
        default_page_size: page_size,
        default_sort: Some(QuerySort::new("created_at", SortDirection::Desc)),
        ..ListConfig::default()
    }
}

/// List manager for categories.
#[must_use]
pub fn category_list(
    api: CategoryApi,
    store: SharedStore<Category>,
    page_size: u32,
    location: Option<Arc<dyn Location>>,
) -> ListManager<CategoryApi> {
    ListManager::with_options(
        api,
        store,
        category_list_config(page_size),
        ListHooks::default(),
        location,
    )
}

/// CRUD manager for one category form.
///
/// `entity` prefills the form and switches to edit mode.
///
/// # Errors
/// Returns an error if the category validators cannot be built.
pub fn category_crud(
    api: CategoryApi,
    entity: Option<Category>,
    notifier: Arc<dyn Notifier>,
    store: Option<SharedStore<Category>>,
) -> ClientResult<CrudManager<CategoryApi>> {
    let values = entity
        .as_ref()
        .map(CategoryFormValues::from_category)
        .unwrap_or_default();
    let config = CrudConfig {
        mode: if entity.is_some() { CrudMode::Edit } else { CrudMode::Create },
        entity,
        messages: category_messages(),
        ..CrudConfig::default()
    };
    let manager = CrudManager::new(api, config, notifier)
        .with_validators(category_validators()?)
        .with_values(values);
    Ok(match store {
        Some(store) => manager.with_store(store),
        None => manager,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use catalog_core::{MemoryLocation, MemorySessionStorage, RecordingNotifier, SessionStore};
    use httpmock::prelude::*;
    use serde_json::json;

    fn api(server: &MockServer) -> CategoryApi {
        let session = SessionStore::new(
            Arc::new(MemorySessionStorage::default()),
            Arc::new(MemoryLocation::new("/categories")),
            "/login",
        );
        category_api(
            HttpClient::new(
                server.base_url().parse().expect("valid URL"),
                Duration::from_secs(5),
                session,
            )
            .expect("client"),
        )
    }

    fn existing() -> Category {
        Category::from_api(json!({
            "id": "c-3",
            "name": "Books",
            "description": "Printed",
            "is_active": true,
            "color": "#abc",
            "position": 2,
            "company_id": "co-1",
            "country_id": "mx",
            "parent_id": null,
            "is_searchable": true,
            "click_action": "open"
        }))
        .expect("category")
    }

    #[test]
    fn update_payload_keeps_ownership_fields() {
        let record = existing();
        let mut form = CategoryFormValues::from_category(&record);
        form.name = "  Novels ".to_string();
        form.color = String::new();

        assert_eq!(
            CategoryCodec.encode_update(&form, Some(&record)),
            json!({
                "name": "Novels",
                "description": "Printed",
                "is_active": true,
                "color": null,
                "position": 2,
                "company_id": "co-1",
                "country_id": "mx",
                "parent_id": null,
                "is_searchable": true,
                "click_action": "open"
            })
        );
    }

    #[test]
    fn list_defaults_sort_newest_first() {
        let config = category_list_config(20);
        assert!(config.preserve_query_params);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(
            config.default_sort,
            Some(QuerySort::new("created_at", SortDirection::Desc))
        );
        assert_eq!(config.debounce, Duration::from_millis(400));
    }

    #[tokio::test]
    async fn list_decodes_numeric_keys_and_integer_flags() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/category");
            then.status(200).json_body(json!({
                "data": [
                    {"id": 1, "name": "Books", "company_id": 3, "country_id": 52, "is_active": 1, "is_searchable": 0},
                    {"id": 2, "name": "Toys", "parent_id": 1, "is_active": 0}
                ],
                "meta": {"current_page": 1, "per_page": 10, "total": 2, "last_page": 1}
            }));
        });

        let page = api(&server)
            .list(&catalog_core::query::ListQuery::new(1, 10))
            .await
            .expect("list");
        assert_eq!(page.data.len(), 2);
        assert!(page.data[0].status.is_active());
        assert_eq!(page.data[0].audit.company_id.as_deref(), Some("3"));
        assert_eq!(page.data[0].audit.is_searchable, Some(false));
        assert!(!page.data[1].status.is_active());
        assert_eq!(page.data[1].audit.parent_id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn edit_form_puts_record_and_reports_success() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT).path("/category/c-3").json_body(json!({
                "name": "Books",
                "description": "Printed",
                "is_active": false,
                "color": "#abc",
                "position": 2,
                "company_id": "co-1",
                "country_id": "mx",
                "parent_id": null,
                "is_searchable": true,
                "click_action": "open"
            }));
            then.status(200).json_body(json!({
                "data": {"id": "c-3", "name": "Books", "is_active": false, "position": 2}
            }));
        });

        let notifier = Arc::new(RecordingNotifier::new());
        let store = SharedStore::new();
        store.update(|store| store.set_all_entities(vec![existing()]));
        let crud = category_crud(api(&server), Some(existing()), notifier.clone(), Some(store.clone()))
            .expect("crud");
        assert!(crud.is_edit());
        crud.set_value(|values| values.status = catalog_core::categories::CategoryStatus::Inactive);

        let updated = crud.update().await.expect("update");
        mock.assert();
        assert!(!updated.status.is_active());
        assert!(store.read(|store| !store.entities[0].status.is_active()));
        assert_eq!(
            notifier.last().map(|n| n.title),
            Some("Category updated successfully".to_string())
        );
    }

    #[tokio::test]
    async fn create_form_rejects_blank_name_without_request() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/category");
            then.status(201);
        });

        let notifier = Arc::new(RecordingNotifier::new());
        let crud = category_crud(api(&server), None, notifier, None).expect("crud");
        assert!(crud.is_create());
        assert!(crud.save().await.is_err());
        mock.assert_calls(0);
    }
}

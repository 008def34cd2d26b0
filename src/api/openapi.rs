//! OpenAPI document for the admin API.

use utoipa::OpenApi;

use super::handlers::{allocation, inventory, licence, registration, system};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "fair-allocator",
        description = "Site inventory, stallholder registrations and history-driven site allocation for a community fair."
    ),
    paths(
        system::health_handler,
        system::state_machines_handler,
        inventory::create_zone,
        inventory::list_zones,
        inventory::create_site,
        inventory::list_sites,
        inventory::create_fair,
        inventory::list_fairs,
        inventory::create_event,
        inventory::list_events,
        inventory::cancel_event,
        inventory::generate_event_sites,
        inventory::create_event_site,
        inventory::list_event_sites,
        inventory::get_event_site,
        inventory::transition_event_site,
        inventory::record_site_history,
        inventory::list_site_history,
        inventory::rebuild_site_history,
        allocation::create_allocation,
        allocation::list_allocations,
        allocation::get_allocation,
        allocation::update_allocation,
        allocation::delete_allocation,
        allocation::run_allocation,
        allocation::list_candidates,
        allocation::cleanup_allocations,
        registration::create_registration,
        registration::list_registrations,
        registration::get_registration,
        registration::transition_registration,
        registration::create_payment,
        registration::list_payments,
        registration::get_payment,
        registration::transition_payment,
        registration::record_payment,
        licence::create_licence,
        licence::list_licences,
        licence::get_licence,
        licence::transition_licence,
        licence::create_batch,
        licence::list_batches,
        licence::submit_batch,
    ),
    components(schemas(ErrorResponse, ErrorBody)),
    tags(
        (name = "System", description = "Health and state machine catalog"),
        (name = "Inventory", description = "Zones, sites, fairs and events"),
        (name = "Event Sites", description = "Per-event site status"),
        (name = "Site History", description = "Yearly occupancy used for allocation"),
        (name = "Allocations", description = "Manual and history-driven allocation"),
        (name = "Registrations", description = "Stallholder bookings"),
        (name = "Payments", description = "Payments against registrations"),
        (name = "Food Licences", description = "Food licence requests and council batches"),
    )
)]
pub struct ApiDoc;

/// Swagger UI at `/swagger-ui`, serving the document at
/// `/api-docs/openapi.json`.
#[cfg(feature = "swagger-ui")]
pub fn swagger_ui() -> utoipa_swagger_ui::SwaggerUi {
    utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_allocation_run() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/allocations/run"));
        assert!(doc.paths.paths.contains_key("/api/v1/event-sites/{id}/transitions"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}

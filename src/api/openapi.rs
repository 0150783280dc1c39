//! OpenAPI specification generated from handler annotations via utoipa.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Top-level OpenAPI document for the Artefacto API.
///
/// Each handler module contributes its own paths and schemas via per-module
/// `#[derive(OpenApi)]` structs that are merged into this root document at
/// startup.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Artefacto API",
        description = "REST backend for the Artefacto cultural heritage platform: temples, artifacts, tickets and image classification.",
        version = "0.1.0",
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and profile management"),
        (name = "temples", description = "Temple catalog and administration"),
        (name = "artifacts", description = "Artifact catalog with per-user bookmark and read flags"),
        (name = "tickets", description = "Ticket offerings per temple"),
        (name = "transactions", description = "Ticket purchase and transaction history"),
        (name = "owned-tickets", description = "Issued tickets and redemption"),
        (name = "ml", description = "Artifact image classification proxy"),
    ),
    components(schemas(ErrorBody))
)]
pub struct ApiDoc;

/// Error envelope returned by all endpoints on failure.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Envelope status, always "error" for failures
    pub status: String,
    /// Human-readable error message
    pub message: String,
}

/// Adds Bearer JWT security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the merged OpenAPI document from all handler modules.
pub fn build_openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    // Each module defines its own XxxApiDoc that lists its paths and schemas.
    doc.merge(super::handlers::auth::AuthApiDoc::openapi());
    doc.merge(super::handlers::temples::TemplesApiDoc::openapi());
    doc.merge(super::handlers::artifacts::ArtifactsApiDoc::openapi());
    doc.merge(super::handlers::tickets::TicketsApiDoc::openapi());
    doc.merge(super::handlers::transactions::TransactionsApiDoc::openapi());
    doc.merge(super::handlers::owned_tickets::OwnedTicketsApiDoc::openapi());
    doc.merge(super::handlers::ml::MlApiDoc::openapi());

    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_spec_is_valid() {
        let spec = build_openapi();

        assert_eq!(spec.info.title, "Artefacto API");

        // Catches missing module merges
        let path_count = spec.paths.paths.len();
        assert!(
            path_count >= 15,
            "Expected at least 15 paths, got {path_count}. A module merge may be missing."
        );

        let schema_count = spec.components.as_ref().map_or(0, |c| c.schemas.len());
        assert!(
            schema_count >= 20,
            "Expected at least 20 schemas, got {schema_count}."
        );

        let has_bearer = spec
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"));
        assert!(has_bearer, "Bearer auth security scheme is missing.");

        let tags: Vec<&str> = spec
            .tags
            .as_ref()
            .map_or(vec![], |t| t.iter().map(|tag| tag.name.as_str()).collect());
        for expected_tag in [
            "auth",
            "temples",
            "artifacts",
            "tickets",
            "transactions",
            "owned-tickets",
            "ml",
        ] {
            assert!(
                tags.contains(&expected_tag),
                "Missing expected tag: {expected_tag}"
            );
        }

        let json = serde_json::to_string(&spec).expect("Spec should serialize to JSON");
        assert!(
            json.len() > 10_000,
            "Spec JSON seems too small: {} bytes",
            json.len()
        );
    }

    #[test]
    fn openapi_spec_operation_count() {
        let spec = build_openapi();
        let mut op_count = 0;

        for item in spec.paths.paths.values() {
            if item.get.is_some() {
                op_count += 1;
            }
            if item.put.is_some() {
                op_count += 1;
            }
            if item.post.is_some() {
                op_count += 1;
            }
            if item.delete.is_some() {
                op_count += 1;
            }
        }

        assert!(
            op_count >= 28,
            "Expected at least 28 operations, got {op_count}. Handler annotations may be missing."
        );
    }

    #[test]
    fn purchase_and_redemption_paths_in_spec() {
        let spec = build_openapi();
        let paths: Vec<&str> = spec.paths.paths.keys().map(|k| k.as_str()).collect();

        // The collection root is registered as context_path + "/", hence the
        // trailing-slash trim.
        let transactions = paths
            .iter()
            .find(|p| p.trim_end_matches('/') == "/api/transactions");
        assert!(
            transactions.is_some(),
            "Missing /api/transactions path in OpenAPI spec. Registered paths: {paths:?}"
        );
        if let Some(path) = transactions {
            let item = &spec.paths.paths[*path];
            assert!(item.post.is_some(), "POST /api/transactions should exist");
            assert!(item.get.is_some(), "GET /api/transactions should exist");
        }

        let redeem = paths.iter().find(|p| p.ends_with("/use"));
        assert!(
            redeem.is_some(),
            "Missing owned-ticket redemption path in OpenAPI spec"
        );
        if let Some(path) = redeem {
            let item = &spec.paths.paths[*path];
            assert!(item.put.is_some(), "PUT .../use should exist");
        }
    }
}

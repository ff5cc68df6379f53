use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

pub async fn openapi_json() -> impl IntoResponse {
    (StatusCode::OK, Json(openapi_spec()))
}

pub async fn swagger_ui() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Basalt Gateway API Docs</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
    <style>
      body { margin: 0; background: #fafafa; }
      .topbar { display: none; }
    </style>
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
      window.ui = SwaggerUIBundle({
        url: '/openapi.json',
        dom_id: '#swagger-ui',
        deepLinking: true,
        displayRequestDuration: true,
        presets: [SwaggerUIBundle.presets.apis],
      });
    </script>
  </body>
</html>
"#,
    )
}

pub async fn docs_redirect() -> Response {
    let mut response = Response::new("".into());
    *response.status_mut() = StatusCode::TEMPORARY_REDIRECT;
    response
        .headers_mut()
        .insert(header::LOCATION, HeaderValue::from_static("/docs/"));
    response
}

fn openapi_spec() -> Value {
    let envelope_schema = json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "data": {},
            "error": { "type": "string" },
            "timestamp": { "type": "string", "format": "date-time" }
        },
        "required": ["success", "timestamp"]
    });

    let relay_responses = json!({
        "200": {
            "description": "Upstream response, passed through verbatim",
            "content": { "application/json": { "schema": { "type": "object" } } }
        },
        "500": {
            "description": "Upstream unreachable or failed",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Envelope" } } }
        }
    });

    let mut paths = serde_json::Map::new();

    paths.insert(
        "/health".to_string(),
        json!({
            "get": {
                "summary": "Gateway health including upstream probes",
                "responses": {
                    "200": {
                        "description": "Health report; upstream entries are healthy/unhealthy/unavailable",
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Envelope" } } }
                    }
                }
            }
        }),
    );

    paths.insert(
        "/metrics".to_string(),
        json!({
            "get": {
                "summary": "Prometheus metrics",
                "responses": { "200": { "description": "Metrics in text format" } }
            }
        }),
    );

    for rule in crate::relay::RULES {
        // OpenAPI uses {id}, the router uses :id
        let path = rule.path.replace(":id", "{id}");
        let method = rule.method.as_str().to_ascii_lowercase();
        let mut operation = json!({
            "summary": format!("Relay to the {} upstream", match rule.upstream {
                crate::relay::UpstreamKind::Core => "core",
                crate::relay::UpstreamKind::Ai => "AI",
            }),
            "responses": relay_responses.clone(),
        });
        if path.contains("{id}") {
            operation["parameters"] = json!([
                { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } }
            ]);
        }

        if let Some(entry) = paths
            .entry(path)
            .or_insert_with(|| json!({}))
            .as_object_mut()
        {
            entry.insert(method, operation);
        }
    }

    paths.insert(
        "/api/v1/ai/models".to_string(),
        json!({
            "get": {
                "summary": "Aggregate model catalog from both upstreams",
                "responses": {
                    "200": {
                        "description": "Merged model list; a failed source contributes an empty list",
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Envelope" } } }
                    }
                }
            }
        }),
    );

    for (path, _) in crate::catalog::ROUTES {
        paths.insert(
            (*path).to_string(),
            json!({
                "get": {
                    "summary": "Catalog data",
                    "responses": {
                        "200": {
                            "description": "Fixed catalog payload in the envelope",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Envelope" } } }
                        }
                    }
                }
            }),
        );
    }

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Basalt Gateway API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "API gateway fronting the Basalt core and AI services. Realtime AI dispatch is served over WebSocket at /ws."
        },
        "servers": [
            { "url": "http://127.0.0.1:3001" }
        ],
        "components": {
            "schemas": {
                "Envelope": envelope_schema
            }
        },
        "paths": Value::Object(paths)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_contains_relay_and_catalog_paths() {
        let spec = openapi_spec();
        assert_eq!(spec["openapi"], "3.0.3");
        assert!(spec["paths"]["/api/v1/projects/{id}"]["get"].is_object());
        assert!(spec["paths"]["/api/v1/ai/sentiment"]["post"].is_object());
        assert!(spec["paths"]["/api/v1/databases"]["get"].is_object());
    }

    #[test]
    fn projects_path_carries_both_methods() {
        let spec = openapi_spec();
        let projects = &spec["paths"]["/api/v1/projects"];
        assert!(projects["get"].is_object());
        assert!(projects["post"].is_object());
    }
}

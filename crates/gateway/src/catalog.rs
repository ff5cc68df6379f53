//! Fixed catalog data served while the platform backends that would own
//! these resources do not exist yet. Every handler returns the uniform
//! envelope around a hardcoded payload; nothing here touches an upstream.

use crate::AppState;
use axum::{routing::get, Json, Router};
use domain::Envelope;
use serde_json::{json, Value};

type CatalogFn = fn() -> Value;

/// The read-only catalog surface. `relay::endpoint_inventory` derives the
/// advertised endpoint list from this table.
pub static ROUTES: &[(&str, CatalogFn)] = &[
    ("/api/v1/databases", databases),
    ("/api/v1/databases/backups", database_backups),
    ("/api/v1/storage", storage_stats),
    ("/api/v1/storage/files", storage_files),
    ("/api/v1/users", users),
    ("/api/v1/users/roles", user_roles),
    ("/api/v1/monitoring/health", monitoring_health),
    ("/api/v1/monitoring/logs", monitoring_logs),
    ("/api/v1/communication/stats", communication_stats),
    ("/api/v1/billing/usage", billing_usage),
    ("/api/v1/billing/invoices", billing_invoices),
    ("/api/v1/settings", settings),
    ("/api/v1/ai/training/jobs", training_jobs),
    ("/api/v1/analytics/realtime", realtime_analytics),
    ("/api/v1/api/keys", api_keys),
];

pub fn mount(mut router: Router<AppState>) -> Router<AppState> {
    for (path, data) in ROUTES {
        let data = *data;
        router = router.route(path, get(move || async move { Json(Envelope::ok(data())) }));
    }
    router
}

fn databases() -> Value {
    json!({
        "databases": [
            {
                "id": "db-001",
                "name": "app-primary",
                "type": "postgresql",
                "version": "16.2",
                "status": "running",
                "host": "db-primary.internal",
                "port": 5432,
                "connections": 42,
                "maxConnections": 100,
                "size": "12.4 GB",
                "lastBackup": "2025-01-14T02:00:00Z"
            },
            {
                "id": "db-002",
                "name": "sessions-cache",
                "type": "redis",
                "version": "7.2",
                "status": "running",
                "host": "cache.internal",
                "port": 6379,
                "connections": 18,
                "maxConnections": 500,
                "size": "850 MB",
                "lastBackup": "2025-01-14T02:15:00Z"
            },
            {
                "id": "db-003",
                "name": "events-archive",
                "type": "mongodb",
                "version": "7.0",
                "status": "maintenance",
                "host": "archive.internal",
                "port": 27017,
                "connections": 0,
                "maxConnections": 200,
                "size": "48.1 GB",
                "lastBackup": "2025-01-13T02:00:00Z"
            }
        ],
        "totalDatabases": 3,
        "totalConnections": 60,
        "totalSize": "61.3 GB"
    })
}

fn database_backups() -> Value {
    json!({
        "backups": [
            {
                "id": "bk-1041",
                "databaseName": "app-primary",
                "type": "full",
                "status": "completed",
                "size": "11.9 GB",
                "duration": "14m 32s",
                "created": "2025-01-14T02:00:00Z"
            },
            {
                "id": "bk-1040",
                "databaseName": "events-archive",
                "type": "incremental",
                "status": "completed",
                "size": "2.3 GB",
                "duration": "6m 05s",
                "created": "2025-01-13T02:00:00Z"
            },
            {
                "id": "bk-1039",
                "databaseName": "sessions-cache",
                "type": "snapshot",
                "status": "failed",
                "size": "0 B",
                "duration": "0m 12s",
                "created": "2025-01-13T02:15:00Z"
            }
        ]
    })
}

fn storage_stats() -> Value {
    json!({
        "totalSpace": "500 GB",
        "usedSpace": "187 GB",
        "availableSpace": "313 GB",
        "buckets": 4,
        "objects": 12874,
        "bandwidthThisMonth": "1.2 TB"
    })
}

fn storage_files() -> Value {
    json!({
        "files": [
            {
                "id": "f-2001",
                "name": "model-weights-v3.bin",
                "type": "binary",
                "size": "4.2 GB",
                "uploaded": "2025-01-10T16:42:00Z",
                "downloads": 31,
                "url": "/storage/models/model-weights-v3.bin"
            },
            {
                "id": "f-2002",
                "name": "training-corpus.jsonl",
                "type": "dataset",
                "size": "920 MB",
                "uploaded": "2025-01-08T09:15:00Z",
                "downloads": 112,
                "url": "/storage/datasets/training-corpus.jsonl"
            },
            {
                "id": "f-2003",
                "name": "launch-banner.png",
                "type": "image",
                "size": "1.4 MB",
                "uploaded": "2025-01-12T11:03:00Z",
                "downloads": 540,
                "url": "/storage/assets/launch-banner.png"
            }
        ]
    })
}

fn users() -> Value {
    json!({
        "users": [
            {
                "id": "u-100",
                "name": "Amara Diallo",
                "email": "amara@example.com",
                "role": "admin",
                "status": "active",
                "avatar": "/avatars/u-100.png",
                "lastLogin": "2025-01-14T08:21:00Z",
                "projects": 6
            },
            {
                "id": "u-101",
                "name": "Jonas Weber",
                "email": "jonas@example.com",
                "role": "developer",
                "status": "active",
                "avatar": "/avatars/u-101.png",
                "lastLogin": "2025-01-13T19:47:00Z",
                "projects": 3
            },
            {
                "id": "u-102",
                "name": "Mei Lin",
                "email": "mei@example.com",
                "role": "viewer",
                "status": "invited",
                "avatar": "/avatars/u-102.png",
                "lastLogin": null,
                "projects": 0
            }
        ]
    })
}

fn user_roles() -> Value {
    json!({
        "roles": [
            {
                "id": "role-admin",
                "name": "Admin",
                "description": "Full access to projects, billing and settings",
                "permissions": ["read", "write", "deploy", "billing", "admin"],
                "userCount": 1
            },
            {
                "id": "role-developer",
                "name": "Developer",
                "description": "Read/write access to projects and AI services",
                "permissions": ["read", "write", "deploy"],
                "userCount": 1
            },
            {
                "id": "role-viewer",
                "name": "Viewer",
                "description": "Read-only access",
                "permissions": ["read"],
                "userCount": 1
            }
        ]
    })
}

fn monitoring_health() -> Value {
    json!({
        "system": {
            "cpu": 34,
            "memory": 61,
            "disk": 48,
            "network": 12
        },
        "services": [
            { "name": "gateway", "status": "healthy", "uptime": "99.98%" },
            { "name": "core-api", "status": "healthy", "uptime": "99.95%" },
            { "name": "ai-services", "status": "degraded", "uptime": "99.10%" },
            { "name": "object-storage", "status": "healthy", "uptime": "100%" }
        ],
        "alerts": {
            "critical": 0,
            "warning": 2,
            "info": 5
        }
    })
}

fn monitoring_logs() -> Value {
    json!({
        "logs": [
            {
                "id": "log-90311",
                "timestamp": "2025-01-14T09:12:44Z",
                "level": "warn",
                "service": "ai-services",
                "message": "inference latency above threshold (p95=2.4s)"
            },
            {
                "id": "log-90310",
                "timestamp": "2025-01-14T09:11:02Z",
                "level": "info",
                "service": "core-api",
                "message": "project proj-42 updated"
            },
            {
                "id": "log-90309",
                "timestamp": "2025-01-14T09:09:51Z",
                "level": "error",
                "service": "object-storage",
                "message": "multipart upload aborted by client"
            }
        ]
    })
}

fn communication_stats() -> Value {
    json!({
        "email": { "sent": 12840, "delivered": 12710 },
        "sms": { "sent": 3120, "delivered": 3098 },
        "push": { "sent": 45210, "opened": 18833 },
        "chat": { "activeChannels": 14, "averageResponse": "42s" }
    })
}

fn billing_usage() -> Value {
    json!({
        "currentPeriod": {
            "start": "2025-01-01",
            "end": "2025-01-31",
            "amountDue": 248.50,
            "currency": "USD"
        },
        "usage": {
            "apiCalls": 1842000,
            "aiTokens": 9640000,
            "storageGb": 187,
            "bandwidthGb": 1228
        },
        "plan": {
            "name": "Scale",
            "includedApiCalls": 2000000,
            "includedAiTokens": 10000000
        }
    })
}

fn billing_invoices() -> Value {
    json!({
        "invoices": [
            {
                "id": "inv-2025-01",
                "number": "INV-0147",
                "date": "2025-01-01",
                "dueDate": "2025-01-15",
                "amount": 248.50,
                "status": "open"
            },
            {
                "id": "inv-2024-12",
                "number": "INV-0139",
                "date": "2024-12-01",
                "dueDate": "2024-12-15",
                "amount": 231.00,
                "status": "paid"
            },
            {
                "id": "inv-2024-11",
                "number": "INV-0131",
                "date": "2024-11-01",
                "dueDate": "2024-11-15",
                "amount": 219.75,
                "status": "paid"
            }
        ]
    })
}

fn settings() -> Value {
    json!({
        "general": {
            "organizationName": "Acme Labs",
            "timezone": "UTC",
            "language": "en",
            "dateFormat": "YYYY-MM-DD",
            "theme": "system",
            "autoSave": true
        },
        "security": {
            "twoFactorRequired": true,
            "sessionTimeoutMinutes": 60,
            "allowedIpRanges": []
        },
        "integrations": {
            "slackWebhook": null,
            "githubConnected": true,
            "pagerdutyConnected": false
        }
    })
}

fn training_jobs() -> Value {
    json!({
        "jobs": [
            {
                "id": "job-771",
                "name": "sentiment-classifier-v4",
                "status": "running",
                "progress": 67,
                "dataset": "training-corpus.jsonl",
                "accuracy": null,
                "endTime": null
            },
            {
                "id": "job-770",
                "name": "summarizer-finetune",
                "status": "completed",
                "progress": 100,
                "dataset": "support-tickets-2024",
                "accuracy": 0.91,
                "endTime": "2025-01-12T22:30:00Z"
            },
            {
                "id": "job-768",
                "name": "intent-router",
                "status": "failed",
                "progress": 23,
                "dataset": "chat-transcripts",
                "accuracy": null,
                "endTime": "2025-01-11T04:12:00Z"
            }
        ]
    })
}

fn realtime_analytics() -> Value {
    json!({
        "activeConnections": 87,
        "requestsPerMinute": 412,
        "aiRequestsPerMinute": 96,
        "averageLatencyMs": 184,
        "errorRatePercent": 0.8
    })
}

fn api_keys() -> Value {
    json!({
        "keys": [
            {
                "id": "key-01",
                "name": "production-backend",
                "key": "bsl_live_****4f2a",
                "permissions": ["read", "write"],
                "requests": 1204883,
                "createdAt": "2024-09-02T10:00:00Z",
                "lastUsed": "2025-01-14T09:14:00Z"
            },
            {
                "id": "key-02",
                "name": "staging",
                "key": "bsl_test_****9c1d",
                "permissions": ["read", "write"],
                "requests": 88412,
                "createdAt": "2024-11-18T15:30:00Z",
                "lastUsed": "2025-01-13T17:02:00Z"
            },
            {
                "id": "key-03",
                "name": "analytics-readonly",
                "key": "bsl_live_****77b0",
                "permissions": ["read"],
                "requests": 40233,
                "createdAt": "2024-12-05T08:45:00Z",
                "lastUsed": "2025-01-14T06:40:00Z"
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_produces_an_object() {
        for (path, data) in ROUTES {
            let value = data();
            assert!(value.is_object(), "{path} should serve a JSON object");
        }
    }

    #[test]
    fn database_listing_is_consistent() {
        let value = databases();
        let list = value["databases"].as_array().expect("databases array");
        assert_eq!(list.len() as u64, value["totalDatabases"].as_u64().expect("count"));

        let connections: u64 = list
            .iter()
            .map(|db| db["connections"].as_u64().expect("connections"))
            .sum();
        assert_eq!(connections, value["totalConnections"].as_u64().expect("total"));
    }
}

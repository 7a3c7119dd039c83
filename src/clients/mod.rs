pub mod readiness_client;

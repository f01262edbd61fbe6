const AGENT_ENDPOINT: &str = "METRIC_AGENT_ENDPOINT";

const DEFAULT_ENDPOINT: &str = "ipc://@/malamute";

pub fn get_default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

pub fn get_endpoint() -> Option<String> {
    std::env::var(AGENT_ENDPOINT).ok().filter(|e| !e.is_empty())
}

const AGENT_IDENTITY: &str = "METRIC_AGENT_IDENTITY";

const DEFAULT_IDENTITY: &str = "metric-store-agent";

pub fn get_default_identity() -> String {
    DEFAULT_IDENTITY.to_string()
}

pub fn get_identity() -> Option<String> {
    std::env::var(AGENT_IDENTITY).ok().filter(|i| !i.is_empty())
}

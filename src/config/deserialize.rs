// ABOUTME: Deserializer for the QA server list.
// ABOUTME: Takes "[user@]host[:port]" strings or mappings, checks each entry and rejects duplicate labels.

use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashSet;

use super::ServerConfig;

pub fn deserialize_servers<'de, D>(deserializer: D) -> Result<NonEmpty<ServerConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: Vec<ServerEntry> = Vec::deserialize(deserializer)?;
    collect_servers(entries).map_err(serde::de::Error::custom)
}

fn collect_servers(entries: Vec<ServerEntry>) -> Result<NonEmpty<ServerConfig>, String> {
    let mut labels = HashSet::new();
    let mut servers = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let server = entry
            .into_server_config()
            .map_err(|reason| format!("servers[{index}]: {reason}"))?;
        if !labels.insert(server.label().to_string()) {
            return Err(format!(
                "servers[{index}]: `{}` is already used by another server",
                server.label()
            ));
        }
        servers.push(server);
    }

    NonEmpty::from_vec(servers).ok_or_else(|| "servers: list at least one QA server".to_string())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Address(String),
    Table(ServerConfig),
}

impl ServerEntry {
    fn into_server_config(self) -> Result<ServerConfig, String> {
        match self {
            ServerEntry::Address(address) => ServerConfig::parse(&address),
            ServerEntry::Table(server) => server.validated(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(s: &str) -> ServerEntry {
        ServerEntry::Address(s.to_string())
    }

    #[test]
    fn errors_name_the_offending_entry() {
        let err = collect_servers(vec![address("qa1"), address("qa2:port")]).unwrap_err();
        assert_eq!(err, "servers[1]: invalid port: port");
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let err = collect_servers(vec![address("qa1"), address("deploy@qa1:2222")]).unwrap_err();
        assert!(err.starts_with("servers[1]: `qa1`"), "{err}");
    }

    #[test]
    fn same_host_under_different_names_is_allowed() {
        let mut staging = ServerConfig::parse("qa1").unwrap();
        staging.name = Some("staging".to_string());
        let servers = collect_servers(vec![address("qa1"), ServerEntry::Table(staging)]).unwrap();
        assert_eq!(servers.len(), 2);
    }

    #[test]
    fn table_entry_without_host_is_rejected() {
        let mut blank = ServerConfig::parse("qa1").unwrap();
        blank.host = "  ".to_string();
        let err = collect_servers(vec![ServerEntry::Table(blank)]).unwrap_err();
        assert_eq!(err, "servers[0]: hostname cannot be empty");
    }

    #[test]
    fn empty_list_asks_for_a_server() {
        let err = collect_servers(Vec::new()).unwrap_err();
        assert_eq!(err, "servers: list at least one QA server");
    }
}

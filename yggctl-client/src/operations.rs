//! Named accessors for the router's admin operations
//!
//! One table drives both session types, so `blocking::Session` and
//! `aio::Session` always expose the same method names with the same
//! argument keys on the wire.

use serde_json::Value;

use yggctl_protocol::Arguments;
use yggctl_utils::Result;

use crate::error::codec_error;
use crate::records::{keyed_records, transit_traffic, Traffic};

macro_rules! operations {
    (
        extra: [$($extra:literal),*];
        $(
            $(#[$doc:meta])*
            $method:ident => $name:literal ( $($arg:ident : $ty:ty),* );
        )*
    ) => {
        /// Operation names understood by the named accessors
        pub const OPERATIONS: &[&str] = &[$($name,)* $($extra,)*];

        impl crate::blocking::Session {
            $(
                $(#[$doc])*
                pub fn $method(&mut self $(, $arg: $ty)*) -> Result<Value> {
                    let arguments = Arguments::new();
                    $(
                        let arguments = arguments
                            .with(stringify!($arg), $arg)
                            .map_err(|e| codec_error(e, None))?;
                    )*
                    self.call($name, arguments)
                }
            )*
        }

        impl crate::aio::Session {
            $(
                $(#[$doc])*
                pub async fn $method(&mut self $(, $arg: $ty)*) -> Result<Value> {
                    let arguments = Arguments::new();
                    $(
                        let arguments = arguments
                            .with(stringify!($arg), $arg)
                            .map_err(|e| codec_error(e, None))?;
                    )*
                    self.call($name, arguments).await
                }
            )*
        }
    };
}

operations! {
    extra: ["DHTping"];
    /// Information about the local node
    get_self => "getSelf"();
    /// Active peer sessions, keyed by address
    get_peers => "getPeers"();
    /// Switch peers, keyed by port
    get_switch_peers => "getSwitchPeers"();
    /// Add a peer by URI, e.g. `tcp://10.0.0.1:12345`
    add_peer => "addPeer"(uri: &str);
    /// Disconnect the peer on a switch port
    remove_peer => "removePeer"(port: u64);
    /// Known DHT nodes
    get_dht => "getDHT"();
    /// Open sessions with other nodes
    get_sessions => "getSessions"();
    get_allowed_encryption_public_keys => "getAllowedEncryptionPublicKeys"();
    add_allowed_encryption_public_key => "addAllowedEncryptionPublicKey"(box_pub_key: &str);
    remove_allowed_encryption_public_key => "removeAllowedEncryptionPublicKey"(box_pub_key: &str);
    /// NodeInfo of a remote node, or of this node when both are `None`
    ///
    /// `None` values are sent as `null`.
    get_node_info => "getNodeInfo"(box_pub_key: Option<&str>, coords: Option<&str>);
    get_tun_tap => "getTunTap"();
    get_multicast_interfaces => "getMulticastInterfaces"();
    /// Crypto-key routes, subnet to public key
    get_routes => "getRoutes"();
    add_route => "addRoute"(subnet: &str, box_pub_key: &str);
    remove_route => "removeRoute"(subnet: &str, box_pub_key: &str);
    get_source_subnets => "getSourceSubnets"();
    add_source_subnet => "addSourceSubnet"(subnet: &str);
    remove_source_subnet => "removeSourceSubnet"(subnet: &str);
    /// Operations the router itself advertises
    list => "list"();
}

fn dht_ping_arguments(box_pub_key: &str, coords: &str, target: Option<&str>) -> Result<Arguments> {
    Arguments::new()
        .with("box_pub_key", box_pub_key)
        .and_then(|args| args.with("coords", coords))
        .and_then(|args| args.with_optional("target", target))
        .map_err(|e| codec_error(e, None))
}

fn switch_peer_traffic(payload: &Value) -> Result<Traffic> {
    Ok(transit_traffic(&keyed_records(payload, "switchpeers", "id")?))
}

fn switch_peer_count(payload: &Value) -> Result<usize> {
    Ok(keyed_records(payload, "switchpeers", "id")?.len())
}

impl crate::blocking::Session {
    /// Ping a DHT node; `target` is left off the wire when `None`
    pub fn dht_ping(
        &mut self,
        box_pub_key: &str,
        coords: &str,
        target: Option<&str>,
    ) -> Result<Value> {
        let arguments = dht_ping_arguments(box_pub_key, coords, target)?;
        self.call("DHTping", arguments)
    }

    /// Bytes sent and received across all switch peers
    pub fn transit_traffic(&mut self) -> Result<Traffic> {
        switch_peer_traffic(&self.get_switch_peers()?)
    }

    /// Number of switch peers
    pub fn node_count(&mut self) -> Result<usize> {
        switch_peer_count(&self.get_switch_peers()?)
    }
}

impl crate::aio::Session {
    /// Ping a DHT node; `target` is left off the wire when `None`
    pub async fn dht_ping(
        &mut self,
        box_pub_key: &str,
        coords: &str,
        target: Option<&str>,
    ) -> Result<Value> {
        let arguments = dht_ping_arguments(box_pub_key, coords, target)?;
        self.call("DHTping", arguments).await
    }

    /// Bytes sent and received across all switch peers
    pub async fn transit_traffic(&mut self) -> Result<Traffic> {
        switch_peer_traffic(&self.get_switch_peers().await?)
    }

    /// Number of switch peers
    pub async fn node_count(&mut self) -> Result<usize> {
        switch_peer_count(&self.get_switch_peers().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{success, StubServer};
    use crate::{aio, blocking, SessionOptions};
    use serde_json::json;

    fn echo_server() -> StubServer {
        StubServer::spawn(|request| success(request.clone()))
    }

    #[test]
    fn test_operation_table() {
        assert_eq!(OPERATIONS.len(), 21);
        assert!(OPERATIONS.contains(&"getSelf"));
        assert!(OPERATIONS.contains(&"DHTping"));
        assert!(OPERATIONS.contains(&"removeSourceSubnet"));
    }

    #[test]
    fn test_blocking_accessors_send_named_arguments() {
        let server = echo_server();
        let mut session = blocking::Session::with_options(server.endpoint(), SessionOptions::default());

        assert_eq!(
            session.add_peer("tcp://10.0.0.1:12345").unwrap(),
            json!({"request": "addPeer", "uri": "tcp://10.0.0.1:12345"})
        );
        assert_eq!(
            session.remove_peer(3).unwrap(),
            json!({"request": "removePeer", "port": 3})
        );
        assert_eq!(
            session.add_route("300::/64", "9a8b").unwrap(),
            json!({"request": "addRoute", "subnet": "300::/64", "box_pub_key": "9a8b"})
        );
        assert_eq!(session.get_tun_tap().unwrap(), json!({"request": "getTunTap"}));
    }

    #[test]
    fn test_get_node_info_sends_nulls() {
        let server = echo_server();
        let mut session = blocking::Session::with_options(server.endpoint(), SessionOptions::default());

        assert_eq!(
            session.get_node_info(None, None).unwrap(),
            json!({"request": "getNodeInfo", "box_pub_key": null, "coords": null})
        );
    }

    #[test]
    fn test_dht_ping_omits_missing_target() {
        let server = echo_server();
        let mut session = blocking::Session::with_options(server.endpoint(), SessionOptions::default());

        assert_eq!(
            session.dht_ping("9a8b", "[1 3]", None).unwrap(),
            json!({"request": "DHTping", "box_pub_key": "9a8b", "coords": "[1 3]"})
        );
        assert_eq!(
            session.dht_ping("9a8b", "[1 3]", Some("7c6d")).unwrap(),
            json!({"request": "DHTping", "box_pub_key": "9a8b", "coords": "[1 3]", "target": "7c6d"})
        );
    }

    #[test]
    fn test_blocking_switch_peer_helpers() {
        let server = StubServer::spawn(|_| {
            success(json!({
                "switchpeers": {
                    "1": {"bytes_sent": 1024, "bytes_recvd": 10},
                    "2": {"bytes_sent": 512, "bytes_recvd": 20}
                }
            }))
        });
        let mut session = blocking::Session::with_options(server.endpoint(), SessionOptions::default());

        assert_eq!(
            session.transit_traffic().unwrap(),
            Traffic {
                sent: 1536,
                received: 30
            }
        );
        assert_eq!(session.node_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_async_accessors_match_blocking() {
        let server = echo_server();
        let mut session = aio::Session::with_options(server.endpoint(), SessionOptions::default());

        assert_eq!(
            session.remove_source_subnet("300::/64").await.unwrap(),
            json!({"request": "removeSourceSubnet", "subnet": "300::/64"})
        );
        assert_eq!(
            session.add_allowed_encryption_public_key("9a8b").await.unwrap(),
            json!({"request": "addAllowedEncryptionPublicKey", "box_pub_key": "9a8b"})
        );
        assert_eq!(
            session.dht_ping("9a8b", "[1]", None).await.unwrap(),
            json!({"request": "DHTping", "box_pub_key": "9a8b", "coords": "[1]"})
        );
        assert_eq!(session.list().await.unwrap(), json!({"request": "list"}));
    }

    #[tokio::test]
    async fn test_async_node_count_requires_section() {
        let server = StubServer::spawn(|_| success(json!({})));
        let mut session = aio::Session::with_options(server.endpoint(), SessionOptions::default());

        let err = session.node_count().await.unwrap_err();
        assert!(matches!(err, yggctl_utils::YggctlError::Protocol(_)));
    }
}

use minecraft_downstream_bridge::{
    command_tree::CommandRegistry,
    config::BridgeConfig,
    entity_id::{EntityId, EntityIdPair, EntityRewriter},
    events::{
        EventHooks, PluginMessageEvent, ServerDisconnectEvent, ServerKickEvent,
        TabCompleteResponseEvent,
    },
    protocol::{
        commands::{CommandNode, Commands, NodeFlags, NodeKind},
        packet::{
            play::{
                StructuredSuggestions, Suggestion, SuggestionRange, BOSS_BAR_ADD, BOSS_BAR_REMOVE,
            },
            player_info::{GameProfile, PlayerInfoActions, PlayerInfoEntry},
            scoreboard::{ObjectiveKind, ObjectiveValue, OBJECTIVE_CREATE, TEAM_CREATE},
            BossBar, CommandSuggestions, Disconnect, KeepAlive, Packet, PlayerInfoRemove,
            PlayerInfoUpdate, PluginMessage, RawPacket, Respawn, ServerData, UpdateObjectives,
            UpdateTeams,
        },
        Decoder, Encoder, PROTOCOL_VERSION,
    },
    server::{JoinQueue, ReconnectHandler, ServerInfo, ServerRef},
    session::{ChannelClient, ClientAction, ConnectReason, Session},
    tab_list::{PlayerDirectory, ProxyIdentity, ServerUnique},
    BridgeError, DownstreamBridge, Forwarding, ProxyContext,
};
use std::sync::{Arc, Mutex};

struct Harness {
    session: Session,
    bridge: DownstreamBridge,
    actions: flume::Receiver<ClientAction>,
    server: ServerRef,
}

fn server(name: &str) -> ServerRef {
    Arc::new(ServerInfo::new(name, "127.0.0.1:25565"))
}

fn harness_with(context: ProxyContext, fallbacks: &[&str]) -> Harness {
    build_harness(context, fallbacks, |session| session)
}

fn build_harness(
    context: ProxyContext,
    fallbacks: &[&str],
    configure: impl FnOnce(Session) -> Session,
) -> Harness {
    let (client, actions) = ChannelClient::new("Steve");
    let session = configure(Session::new(
        "Steve",
        0xabc,
        PROTOCOL_VERSION,
        Box::new(client),
        Box::new(ServerUnique::new()),
        Box::new(JoinQueue::new(fallbacks.iter().map(|name| server(name)).collect())),
    ));
    let backend = server("lobby");
    let bridge = DownstreamBridge::new(&session, ServerRef::clone(&backend), Arc::new(context));
    Harness {
        session,
        bridge,
        actions,
        server: backend,
    }
}

fn harness() -> Harness {
    harness_with(ProxyContext::default(), &[])
}

impl Harness {
    fn handle(&mut self, packet: impl Into<Packet>) -> Forwarding {
        let raw = RawPacket::from_packet(&packet.into());
        self.bridge.handle(&mut self.session, raw).unwrap()
    }

    fn actions(&self) -> Vec<ClientAction> {
        self.actions.try_iter().collect()
    }

    fn sent_packets(&self) -> Vec<Packet> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                ClientAction::Send(raw) => Some(raw.decode(PROTOCOL_VERSION).unwrap()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Default)]
struct Recorder {
    veto_kicks: bool,
    veto_plugin_messages: bool,
    rewrite_suggestions: Option<Vec<String>>,
    disconnects: Mutex<Vec<String>>,
}

impl EventHooks for Recorder {
    fn on_plugin_message(&self, event: &mut PluginMessageEvent) {
        event.cancelled = self.veto_plugin_messages;
    }

    fn on_server_kick(&self, event: &mut ServerKickEvent) {
        event.cancelled = self.veto_kicks;
        event.reason = format!("[kicked] {}", event.reason);
    }

    fn on_server_disconnect(&self, event: &ServerDisconnectEvent) {
        self.disconnects
            .lock()
            .unwrap()
            .push(event.server.name().to_owned());
    }

    fn on_tab_complete_response(&self, event: &mut TabCompleteResponseEvent) {
        if let Some(suggestions) = &self.rewrite_suggestions {
            event.suggestions = suggestions.clone();
        }
    }
}

#[test]
fn kick_ends_session_with_reason_and_is_never_forwarded() {
    let mut harness = harness_with(
        ProxyContext::default().with_hooks(Arc::new(Recorder::default())),
        &["hub"],
    );
    let forwarding = harness.handle(Disconnect {
        reason: r#"{"text":"Banned"}"#.into(),
    });
    assert_eq!(forwarding, Forwarding::Drop);
    assert!(harness.bridge.server().is_obsolete());

    let actions = harness.actions();
    let [ClientAction::Disconnect(reason)] = actions.as_slice() else {
        panic!("expected only a disconnect, got {actions:?}");
    };
    assert_eq!(reason, r#"[kicked] {"text":"Banned"}"#);
}

#[test]
fn vetoed_kick_redirects_to_next_server() {
    let mut harness = harness_with(
        ProxyContext::default().with_hooks(Arc::new(Recorder {
            veto_kicks: true,
            ..Default::default()
        })),
        &["lobby", "hub"],
    );
    harness.handle(Disconnect {
        reason: r#"{"text":"Restarting"}"#.into(),
    });

    let actions = harness.actions();
    let [ClientAction::Connect { server, reason }] = actions.as_slice() else {
        panic!("expected a redirect, got {actions:?}");
    };
    assert_eq!(server.name(), "hub");
    assert_eq!(*reason, ConnectReason::KickRedirect);
}

#[test]
fn vetoed_kick_without_candidate_disconnects() {
    let mut harness = harness_with(
        ProxyContext::default().with_hooks(Arc::new(Recorder {
            veto_kicks: true,
            ..Default::default()
        })),
        &[],
    );
    harness.handle(Disconnect {
        reason: r#"{"text":"Bye"}"#.into(),
    });
    assert!(matches!(
        harness.actions().as_slice(),
        [ClientAction::Disconnect(_)]
    ));
}

#[test]
fn obsolete_bridge_ignores_packets() {
    let mut harness = harness();
    harness.handle(Disconnect {
        reason: "{}".into(),
    });
    harness.actions();

    assert_eq!(harness.handle(KeepAlive { id: 1 }), Forwarding::Drop);
    assert!(harness.bridge.server().keep_alives().is_empty());
    harness.handle(Disconnect {
        reason: "{}".into(),
    });
    assert!(harness.actions().is_empty());
}

struct SwapFirstInt;

impl EntityRewriter for SwapFirstInt {
    fn rewrite_clientbound(
        &self,
        packet: &mut RawPacket,
        server_id: EntityId,
        client_id: EntityId,
        _protocol_version: i32,
    ) {
        let bytes = packet.bytes_mut();
        if bytes[1..5] == server_id.as_i32().to_be_bytes() {
            bytes[1..5].copy_from_slice(&client_id.as_i32().to_be_bytes());
        }
    }
}

#[test]
fn unhandled_packets_are_forwarded_with_entity_rewrite() {
    let mut harness = build_harness(ProxyContext::default(), &[], |session| {
        session.with_entity_rewrite(
            EntityIdPair {
                client: EntityId::new(1),
                server: EntityId::new(7),
            },
            Arc::new(SwapFirstInt),
        )
    });

    let mut bytes = vec![0x55];
    bytes.extend(7i32.to_be_bytes());
    bytes.extend([0xaa, 0xbb]);
    let raw = RawPacket::new(bytes);
    assert_eq!(
        harness.bridge.handle(&mut harness.session, raw.clone()).unwrap(),
        Forwarding::Forward(raw.clone())
    );

    harness.bridge.process(&mut harness.session, raw).unwrap();
    let actions = harness.actions();
    let [ClientAction::Send(sent)] = actions.as_slice() else {
        panic!("expected one forwarded packet, got {actions:?}");
    };
    assert_eq!(sent.bytes(), [0x55, 0, 0, 0, 1, 0xaa, 0xbb]);
}

#[derive(Default)]
struct RememberServer(Mutex<Vec<(String, String)>>);

impl ReconnectHandler for RememberServer {
    fn set_server(&self, player: &str, server: &ServerRef) {
        self.0
            .lock()
            .unwrap()
            .push((player.to_owned(), server.name().to_owned()));
    }
}

#[test]
fn backend_close_reports_lost_connection() {
    let hooks = Arc::new(Recorder::default());
    let reconnect = Arc::new(RememberServer::default());
    let mut harness = harness_with(
        ProxyContext::default()
            .with_hooks(hooks.clone())
            .with_reconnect_handler(reconnect.clone()),
        &[],
    );
    assert!(harness.server.has_player("Steve"));

    harness.bridge.disconnected(&mut harness.session);
    assert!(!harness.server.has_player("Steve"));
    assert_eq!(
        reconnect.0.lock().unwrap().as_slice(),
        [("Steve".to_owned(), "lobby".to_owned())]
    );
    assert!(matches!(
        harness.actions().as_slice(),
        [ClientAction::Disconnect(reason)] if reason == "[Proxy] Lost connection to server."
    ));
    assert_eq!(hooks.disconnects.lock().unwrap().as_slice(), ["lobby"]);
}

#[test]
fn backend_close_after_redirect_only_notifies_hooks() {
    let hooks = Arc::new(Recorder::default());
    let mut harness = harness_with(ProxyContext::default().with_hooks(hooks.clone()), &["hub"]);
    harness
        .bridge
        .exception(&mut harness.session, &anyhow::anyhow!("connection reset"));
    harness.actions();

    harness.bridge.disconnected(&mut harness.session);
    assert!(harness.actions().is_empty());
    assert_eq!(hooks.disconnects.lock().unwrap().len(), 1);
}

#[test]
fn failure_with_fallback_redirects_once() {
    let mut harness = harness_with(ProxyContext::default(), &["hub"]);
    harness
        .bridge
        .exception(&mut harness.session, &anyhow::anyhow!("connection reset"));
    assert!(harness.bridge.server().is_obsolete());

    let actions = harness.actions();
    let [ClientAction::Connect { server, reason }, ClientAction::Message(message)] =
        actions.as_slice()
    else {
        panic!("expected a redirect and a notice, got {actions:?}");
    };
    assert_eq!(server.name(), "hub");
    assert_eq!(*reason, ConnectReason::ServerDownRedirect);
    assert!(message.contains("went down"));

    harness
        .bridge
        .exception(&mut harness.session, &anyhow::anyhow!("again"));
    assert!(harness.actions().is_empty());
}

#[test]
fn failure_without_fallback_disconnects() {
    let mut harness = harness();
    harness
        .bridge
        .exception(&mut harness.session, &anyhow::anyhow!("connection reset"));
    assert!(matches!(
        harness.actions().as_slice(),
        [ClientAction::Disconnect(reason)] if reason.ends_with("connection reset")
    ));
}

struct Directory;

impl PlayerDirectory for Directory {
    fn resolve(&self, backend_id: u128) -> Option<ProxyIdentity> {
        (backend_id == 5).then(|| ProxyIdentity {
            unique_id: 0xabc,
            properties: Vec::new(),
        })
    }
}

#[test]
fn tab_list_packets_are_rewritten_and_never_forwarded() {
    let mut harness = harness_with(
        ProxyContext::default().with_directory(Arc::new(Directory)),
        &[],
    );
    let update = PlayerInfoUpdate {
        actions: PlayerInfoActions::ADD_PLAYER,
        entries: vec![PlayerInfoEntry {
            uuid: 5,
            profile: Some(GameProfile {
                name: "Steve".into(),
                properties: Vec::new(),
            }),
            ..Default::default()
        }],
    };
    assert_eq!(harness.handle(update), Forwarding::Drop);
    assert_eq!(
        harness.handle(PlayerInfoRemove { uuids: vec![5] }),
        Forwarding::Drop
    );

    let packets = harness.sent_packets();
    let [Packet::PlayerInfoUpdate(update), Packet::PlayerInfoRemove(remove)] = packets.as_slice()
    else {
        panic!("unexpected tab-list output {packets:?}");
    };
    assert_eq!(update.entries[0].uuid, 0xabc);
    assert_eq!(remove.uuids, [0xabc]);
}

#[test]
fn boss_bars_and_dimension_are_tracked() {
    let mut harness = harness();
    for (uuid, action) in [(1, BOSS_BAR_ADD), (2, BOSS_BAR_ADD), (1, BOSS_BAR_REMOVE), (2, 4)] {
        let forwarding = harness.handle(BossBar {
            uuid,
            action,
            ignored_data: Vec::new(),
        });
        assert!(matches!(forwarding, Forwarding::Forward(_)));
    }
    assert_eq!(harness.session.boss_bars().len(), 1);
    assert!(harness.session.boss_bars().contains(&2));

    let forwarding = harness.handle(Respawn {
        dimension_type: "minecraft:the_nether".into(),
        dimension_name: "minecraft:the_nether".into(),
        ignored_data: vec![0; 12],
    });
    assert!(matches!(forwarding, Forwarding::Forward(_)));
    assert_eq!(harness.session.dimension(), Some("minecraft:the_nether"));
}

#[test]
fn server_data_is_dropped() {
    let mut harness = harness();
    assert_eq!(
        harness.handle(ServerData {
            ignored_data: vec![1, 2, 3]
        }),
        Forwarding::Drop
    );
    assert!(harness.actions().is_empty());
}

fn create_team(name: &str) -> UpdateTeams {
    UpdateTeams {
        name: name.into(),
        mode: TEAM_CREATE,
        info: Some(
            minecraft_downstream_bridge::protocol::packet::scoreboard::TeamInfo {
                display_name: r#"{"text":""}"#.into(),
                friendly_flags: 0,
                name_tag_visibility: "always".into(),
                collision_rule: "always".into(),
                color: 0,
                prefix: r#"{"text":""}"#.into(),
                suffix: r#"{"text":""}"#.into(),
            },
        ),
        members: Some(vec!["Steve".into()]),
    }
}

#[test]
fn team_packets_follow_injected_policy() {
    let mut harness = harness_with(
        ProxyContext::default()
            .with_team_policy(Arc::new(|server: &str, team: &str| {
                server == "lobby" && team.starts_with("mg_")
            })),
        &[],
    );
    assert!(matches!(
        harness.handle(create_team("mg_red")),
        Forwarding::Forward(_)
    ));
    assert_eq!(harness.handle(create_team("red")), Forwarding::Drop);

    let scoreboard = harness.session.scoreboard();
    assert!(scoreboard.team("mg_red").is_some());
    assert!(scoreboard.team("red").unwrap().members.contains("Steve"));
}

#[test]
fn default_policy_swallows_teams() {
    let mut harness = harness();
    assert_eq!(harness.handle(create_team("red")), Forwarding::Drop);
}

#[test]
fn configured_server_passes_every_team() {
    let config = BridgeConfig::parse(
        r#"
        [team_passthrough]
        servers = ["LOBBY"]
        "#,
    )
    .unwrap();
    let mut harness = harness_with(ProxyContext::from_config(&config), &[]);
    assert!(matches!(
        harness.handle(create_team("red")),
        Forwarding::Forward(_)
    ));
}

#[test]
fn scoreboard_violation_is_fatal() {
    let mut harness = harness();
    let raw = RawPacket::from_packet(&Packet::from(UpdateObjectives {
        name: "kills".into(),
        action: 3,
        value: None,
    }));
    assert!(matches!(
        harness.bridge.handle(&mut harness.session, raw),
        Err(BridgeError::UnknownObjectiveAction(3))
    ));
}

#[test]
fn objectives_are_mirrored_and_forwarded() {
    let mut harness = harness();
    let forwarding = harness.handle(UpdateObjectives {
        name: "kills".into(),
        action: OBJECTIVE_CREATE,
        value: Some(ObjectiveValue {
            display_text: r#"{"text":"Kills"}"#.into(),
            kind: ObjectiveKind::Integer,
        }),
    });
    assert!(matches!(forwarding, Forwarding::Forward(_)));
    assert!(harness.session.scoreboard().objective("kills").is_some());
}

#[test]
fn keep_alive_ledger_is_capped() {
    let config = minecraft_downstream_bridge::config::BridgeConfig {
        timeout_ms: 1000,
        ..Default::default()
    };
    let mut harness = harness_with(ProxyContext::from_config(&config), &[]);
    for id in 0..100 {
        assert!(matches!(
            harness.handle(KeepAlive { id }),
            Forwarding::Forward(_)
        ));
    }
    assert_eq!(harness.bridge.server().keep_alives().len(), 20);
}

fn brand(brand: &str) -> PluginMessage {
    let mut data = Vec::new();
    Encoder::new(&mut data).write_string(brand);
    PluginMessage {
        channel: "minecraft:brand".into(),
        data,
    }
}

fn sample_context() -> ProxyContext {
    let config = minecraft_downstream_bridge::config::BridgeConfig {
        proxy_name: "Sample".into(),
        proxy_version: "1.0".into(),
        ..Default::default()
    };
    ProxyContext::from_config(&config)
}

#[test]
fn brand_is_rewritten_and_sent_directly() {
    let mut harness = harness_with(sample_context(), &[]);
    assert_eq!(harness.handle(brand("Paper")), Forwarding::Drop);

    let packets = harness.sent_packets();
    let [Packet::PluginMessage(message)] = packets.as_slice() else {
        panic!("expected the rewritten brand, got {packets:?}");
    };
    assert_eq!(
        Decoder::new(&message.data).read_string().unwrap(),
        "Sample (1.0) <- Paper"
    );
}

#[test]
fn brand_naming_this_proxy_is_fatal() {
    let mut harness = harness_with(sample_context(), &[]);
    let raw = RawPacket::from_packet(&Packet::from(brand("Sample (1.0) <- Paper")));
    assert!(matches!(
        harness.bridge.handle(&mut harness.session, raw),
        Err(BridgeError::SelfConnection { .. })
    ));
    assert!(harness.actions().is_empty());
}

#[test]
fn plugin_messages_honor_veto_and_reserved_channels() {
    let mut harness = harness_with(
        sample_context().with_hooks(Arc::new(Recorder {
            veto_plugin_messages: true,
            ..Default::default()
        })),
        &[],
    );
    assert_eq!(harness.handle(brand("Paper")), Forwarding::Drop);
    assert!(harness.actions().is_empty());

    let mut harness = harness_with(sample_context(), &[]);
    let internal = PluginMessage {
        channel: "BungeeCord".into(),
        data: vec![0, 7, b'C', b'o', b'n', b'n', b'e', b'c', b't'],
    };
    assert_eq!(harness.handle(internal), Forwarding::Drop);
    let other = PluginMessage {
        channel: "minecraft:register".into(),
        data: b"example:channel".to_vec(),
    };
    assert!(matches!(harness.handle(other), Forwarding::Forward(_)));
    assert!(harness.actions().is_empty());
}

#[test]
fn structured_suggestions_keep_range_through_bridge() {
    let mut harness = harness_with(
        ProxyContext::default().with_hooks(Arc::new(Recorder {
            rewrite_suggestions: Some(vec!["a".into(), "c".into()]),
            ..Default::default()
        })),
        &[],
    );
    let range = SuggestionRange {
        start: 3,
        length: 2,
    };
    let response = CommandSuggestions::Structured(StructuredSuggestions {
        transaction_id: 9,
        range,
        suggestions: vec![
            Suggestion {
                text: "a".into(),
                tooltip: None,
            },
            Suggestion {
                text: "b".into(),
                tooltip: None,
            },
        ],
    });
    assert_eq!(harness.handle(response), Forwarding::Drop);

    let packets = harness.sent_packets();
    let [Packet::CommandSuggestions(CommandSuggestions::Structured(sent))] = packets.as_slice()
    else {
        panic!("expected structured suggestions, got {packets:?}");
    };
    assert_eq!(sent.range, range);
    assert_eq!(sent.transaction_id, 9);
    let texts: Vec<_> = sent.suggestions.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, ["a", "c"]);
}

fn backend_commands() -> Commands {
    Commands {
        nodes: vec![
            CommandNode {
                kind: NodeKind::Root,
                flags: NodeFlags::empty(),
                children: vec![1],
                redirect: None,
                name: None,
                parser: None,
                suggestions: None,
            },
            CommandNode {
                kind: NodeKind::Literal,
                flags: NodeFlags::EXECUTABLE,
                children: vec![],
                redirect: None,
                name: Some("spawn".into()),
                parser: None,
                suggestions: None,
            },
        ],
        root_index: 0,
    }
}

#[test]
fn proxy_commands_are_merged_once() {
    let mut registry = CommandRegistry::new();
    registry.register("foo", Some("proxy.foo".into()));
    registry.register("spawn", None);
    let context = ProxyContext::default().with_commands(registry);
    let mut harness = build_harness(context, &[], |session| {
        session.with_permissions(["proxy.foo".to_owned()])
    });

    assert_eq!(harness.handle(backend_commands()), Forwarding::Drop);
    let packets = harness.sent_packets();
    let [Packet::Commands(merged)] = packets.as_slice() else {
        panic!("expected the merged tree, got {packets:?}");
    };
    let mut names = merged.top_level_literals();
    names.sort_unstable();
    assert_eq!(names, ["foo", "spawn"]);

    // A tree that already has every command passes through untouched.
    assert!(matches!(
        harness.handle(merged.clone()),
        Forwarding::Forward(_)
    ));
}

#[test]
fn commands_pass_through_without_permission() {
    let mut registry = CommandRegistry::new();
    registry.register("foo", Some("proxy.foo".into()));
    let mut harness = harness_with(ProxyContext::default().with_commands(registry), &[]);
    assert!(matches!(
        harness.handle(backend_commands()),
        Forwarding::Forward(_)
    ));
}

#[test]
fn server_switch_clears_client_state() {
    let mut harness = harness();
    harness.handle(BossBar {
        uuid: 3,
        action: BOSS_BAR_ADD,
        ignored_data: Vec::new(),
    });
    harness.handle(create_team("red"));
    harness.handle(PlayerInfoUpdate {
        actions: PlayerInfoActions::ADD_PLAYER,
        entries: vec![PlayerInfoEntry {
            uuid: 8,
            profile: Some(GameProfile::default()),
            ..Default::default()
        }],
    });
    harness.actions();

    harness.session.reset_for_server_switch();
    let packets = harness.sent_packets();
    assert!(packets
        .iter()
        .any(|p| matches!(p, Packet::UpdateTeams(t) if t.name == "red")));
    assert!(packets
        .iter()
        .any(|p| matches!(p, Packet::BossBar(b) if b.uuid == 3 && b.action == BOSS_BAR_REMOVE)));
    assert!(packets
        .iter()
        .any(|p| matches!(p, Packet::PlayerInfoRemove(r) if r.uuids == [8])));
    assert!(harness.session.boss_bars().is_empty());
}

#[test]
fn bridge_describes_itself() {
    let harness = harness();
    assert_eq!(
        harness.bridge.to_string(),
        "[Steve] <-> DownstreamBridge <-> [lobby]"
    );
}

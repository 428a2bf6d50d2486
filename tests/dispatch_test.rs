//! End-to-end tests for module lifecycle and event dispatch
//! Run with: cargo test --test dispatch_test

use async_trait::async_trait;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use rook_bot::application::broker::VariableBroker;
use rook_bot::application::dispatch::{Dispatcher, EventRegistry};
use rook_bot::application::errors::{HostError, InvokeError, LoadError, ModuleError};
use rook_bot::application::services::ServerWorkers;
use rook_bot::domain::entities::{
    ModuleDescriptor, OutputLine, ParseType, PermissionRequirement, PrivilegeTier, ProtocolEvent,
    Sender, ServerId,
};
use rook_bot::domain::traits::{
    AdminCommand, BotModule, CallbackHandle, HandlerCall, HostCapabilities, ModuleInvoker,
    ProtocolSink, Registrar,
};
use rook_bot::infrastructure::modules::{
    ContextId, ContextState, IsolationContext, ModuleFactory, ModuleManager, ModuleTable,
    SlotState, TrustLevel,
};

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("warn")
            .try_init();
    });
}

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn logged(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Test module registering one command key; records every invocation and
/// optionally replies with a fixed line.
struct RecordingModule {
    label: String,
    key: String,
    permission: Option<PermissionRequirement>,
    reply: Option<String>,
    log: Log,
    handle: Option<CallbackHandle>,
}

impl RecordingModule {
    fn ctor(
        label: &str,
        key: &str,
        permission: Option<PermissionRequirement>,
        reply: Option<&str>,
        log: Log,
    ) -> impl Fn() -> Box<dyn BotModule> + Send + Sync + 'static {
        let label = label.to_string();
        let key = key.to_string();
        let reply = reply.map(str::to_string);
        move || {
            Box::new(RecordingModule {
                label: label.clone(),
                key: key.clone(),
                permission,
                reply: reply.clone(),
                log: log.clone(),
                handle: None,
            })
        }
    }
}

impl BotModule for RecordingModule {
    fn name(&self) -> &str {
        &self.label
    }

    fn init(&mut self, reg: &mut Registrar, _caps: &HostCapabilities) -> Result<(), ModuleError> {
        self.handle = Some(reg.command(&self.key, &[ParseType::ChannelMessage], self.permission));
        Ok(())
    }

    fn handle(&self, call: &HandlerCall) -> Result<Vec<OutputLine>, ModuleError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.label, call.args));
        Ok(self
            .reply
            .iter()
            .map(|text| OutputLine::new(call.server_id, call.reply_target(), text.clone()))
            .collect())
    }
}

/// Module whose handler raises, by Err or by panic.
struct FaultyModule {
    key: String,
    panics: bool,
}

impl FaultyModule {
    fn ctor(key: &str, panics: bool) -> impl Fn() -> Box<dyn BotModule> + Send + Sync + 'static {
        let key = key.to_string();
        move || {
            Box::new(FaultyModule {
                key: key.clone(),
                panics,
            })
        }
    }
}

impl BotModule for FaultyModule {
    fn name(&self) -> &str {
        "faulty"
    }

    fn init(&mut self, reg: &mut Registrar, _caps: &HostCapabilities) -> Result<(), ModuleError> {
        reg.command(&self.key, &[ParseType::ChannelMessage], None);
        Ok(())
    }

    fn handle(&self, _call: &HandlerCall) -> Result<Vec<OutputLine>, ModuleError> {
        if self.panics {
            panic!("boom");
        }
        Err(ModuleError::Failed("boom".to_string()))
    }
}

/// Wildcard module whose simulated fetch always fails; it reports the
/// failure as a normal output line.
struct UrlWatchModule {
    log: Log,
}

impl UrlWatchModule {
    fn ctor(log: Log) -> impl Fn() -> Box<dyn BotModule> + Send + Sync + 'static {
        move || Box::new(UrlWatchModule { log: log.clone() })
    }
}

impl BotModule for UrlWatchModule {
    fn name(&self) -> &str {
        "url-watch"
    }

    fn init(&mut self, reg: &mut Registrar, _caps: &HostCapabilities) -> Result<(), ModuleError> {
        reg.wildcard("http://*", &[ParseType::ChannelMessage], None);
        Ok(())
    }

    fn handle(&self, call: &HandlerCall) -> Result<Vec<OutputLine>, ModuleError> {
        self.log.lock().unwrap().push(call.args.clone());
        Ok(vec![OutputLine::new(
            call.server_id,
            call.reply_target(),
            format!("couldn't fetch {}", call.args),
        )])
    }
}

/// Module that registers and then fails its own initialization.
struct BadInitModule;

impl BotModule for BadInitModule {
    fn name(&self) -> &str {
        "bad-init"
    }

    fn init(&mut self, reg: &mut Registrar, _caps: &HostCapabilities) -> Result<(), ModuleError> {
        reg.command("doomed", &[ParseType::ChannelMessage], None);
        Err(ModuleError::Failed("init refused".to_string()))
    }

    fn handle(&self, _call: &HandlerCall) -> Result<Vec<OutputLine>, ModuleError> {
        Ok(Vec::new())
    }
}

/// Module whose handler blocks longer than the configured bound.
struct SlowModule {
    key: String,
    delay: Duration,
    reply: String,
}

impl SlowModule {
    fn ctor(
        key: &str,
        delay: Duration,
        reply: &str,
    ) -> impl Fn() -> Box<dyn BotModule> + Send + Sync + 'static {
        let key = key.to_string();
        let reply = reply.to_string();
        move || {
            Box::new(SlowModule {
                key: key.clone(),
                delay,
                reply: reply.clone(),
            })
        }
    }
}

impl BotModule for SlowModule {
    fn name(&self) -> &str {
        "slow"
    }

    fn init(&mut self, reg: &mut Registrar, _caps: &HostCapabilities) -> Result<(), ModuleError> {
        reg.command(&self.key, &[ParseType::ChannelMessage], None);
        Ok(())
    }

    fn handle(&self, call: &HandlerCall) -> Result<Vec<OutputLine>, ModuleError> {
        std::thread::sleep(self.delay);
        Ok(vec![OutputLine::new(
            call.server_id,
            call.reply_target(),
            self.reply.clone(),
        )])
    }
}

/// Module serving one key on every server, slow only on one of them.
struct UnevenModule {
    key: String,
    slow_on: ServerId,
    delay: Duration,
}

impl UnevenModule {
    fn ctor(
        key: &str,
        slow_on: ServerId,
        delay: Duration,
    ) -> impl Fn() -> Box<dyn BotModule> + Send + Sync + 'static {
        let key = key.to_string();
        move || {
            Box::new(UnevenModule {
                key: key.clone(),
                slow_on,
                delay,
            })
        }
    }
}

impl BotModule for UnevenModule {
    fn name(&self) -> &str {
        "uneven"
    }

    fn init(&mut self, reg: &mut Registrar, _caps: &HostCapabilities) -> Result<(), ModuleError> {
        reg.command(&self.key, &[ParseType::ChannelMessage], None);
        Ok(())
    }

    fn handle(&self, call: &HandlerCall) -> Result<Vec<OutputLine>, ModuleError> {
        if call.server_id == self.slow_on {
            std::thread::sleep(self.delay);
        }
        Ok(vec![OutputLine::new(
            call.server_id,
            call.reply_target(),
            format!("done on {}", call.server_id),
        )])
    }
}

struct CollectSink {
    lines: Arc<Mutex<Vec<OutputLine>>>,
}

#[async_trait]
impl ProtocolSink for CollectSink {
    async fn deliver(&self, lines: Vec<OutputLine>) -> Result<(), HostError> {
        self.lines.lock().unwrap().extend(lines);
        Ok(())
    }
}

struct Rig {
    manager: Arc<ModuleManager>,
    registry: Arc<EventRegistry>,
    dispatcher: Arc<Dispatcher>,
    broker: Arc<VariableBroker>,
    _admin_rx: tokio::sync::mpsc::UnboundedReceiver<AdminCommand>,
}

/// Assemble a host over the given factory with one slot per named module.
fn rig_with_timeout(factory: ModuleFactory, modules: &[&str], timeout: Duration) -> Rig {
    ensure_init();
    let registry = Arc::new(EventRegistry::new());
    let table = Arc::new(ModuleTable::new());
    let broker = Arc::new(VariableBroker::new());
    let descriptors = modules
        .iter()
        .map(|name| (ModuleDescriptor::new(*name, *name), false))
        .collect();
    let (manager, admin_rx) = ModuleManager::new(
        factory,
        registry.clone(),
        table.clone(),
        broker.clone(),
        timeout,
        descriptors,
    );
    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        table as Arc<dyn ModuleInvoker>,
        "?",
    ));
    Rig {
        manager,
        registry,
        dispatcher,
        broker,
        _admin_rx: admin_rx,
    }
}

fn rig(factory: ModuleFactory, modules: &[&str]) -> Rig {
    rig_with_timeout(factory, modules, Duration::from_secs(5))
}

fn chan(text: &str) -> ProtocolEvent {
    ProtocolEvent::channel_message(ServerId(1), Sender::new("alice"), "#chat", text)
}

fn texts(lines: &[OutputLine]) -> Vec<&str> {
    lines.iter().map(|l| l.text.as_str()).collect()
}

#[tokio::test]
async fn same_key_handlers_fire_in_load_order_and_all_fire() {
    let log = new_log();
    let mut factory = ModuleFactory::new();
    factory.register(
        "first",
        RecordingModule::ctor("first", "ping", None, Some("pong-one"), log.clone()),
    );
    factory.register(
        "second",
        RecordingModule::ctor("second", "ping", None, Some("pong-two"), log.clone()),
    );
    let rig = rig(factory, &["first", "second"]);
    rig.manager.load("first").await.unwrap();
    rig.manager.load("second").await.unwrap();

    let lines = rig.dispatcher.dispatch(&chan("?ping")).await;

    assert_eq!(logged(&log), vec!["first:", "second:"]);
    assert_eq!(texts(&lines), vec!["pong-one", "pong-two"]);
}

#[tokio::test]
async fn unloaded_module_is_never_invoked_again() {
    let log = new_log();
    let mut factory = ModuleFactory::new();
    factory.register(
        "rec",
        RecordingModule::ctor("rec", "hello", None, Some("hi"), log.clone()),
    );
    let rig = rig(factory, &["rec"]);
    rig.manager.load("rec").await.unwrap();

    assert_eq!(texts(&rig.dispatcher.dispatch(&chan("?hello")).await), vec!["hi"]);
    assert_eq!(logged(&log).len(), 1);

    rig.manager.unload("rec").await.unwrap();
    let status = rig.manager.status().await;
    assert_eq!(status[0].state, SlotState::Unloaded);
    assert_eq!(rig.registry.binding_count(), 0);

    let lines = rig.dispatcher.dispatch(&chan("?hello")).await;
    assert!(lines.is_empty());
    assert_eq!(logged(&log).len(), 1);
}

#[tokio::test]
async fn slot_is_reusable_after_unload() {
    let log = new_log();
    let mut factory = ModuleFactory::new();
    factory.register(
        "rec",
        RecordingModule::ctor("rec", "hello", None, Some("hi"), log.clone()),
    );
    let rig = rig(factory, &["rec"]);
    rig.manager.load("rec").await.unwrap();
    rig.manager.reload("rec").await.unwrap();

    let lines = rig.dispatcher.dispatch(&chan("?hello")).await;
    assert_eq!(texts(&lines), vec!["hi"]);
}

#[tokio::test]
async fn faulting_handler_does_not_suppress_the_others() {
    let log = new_log();
    let mut factory = ModuleFactory::new();
    factory.register("erring", FaultyModule::ctor("go", false));
    factory.register("panicking", FaultyModule::ctor("go", true));
    factory.register(
        "steady",
        RecordingModule::ctor("steady", "go", None, Some("still here"), log.clone()),
    );
    let rig = rig(factory, &["erring", "panicking", "steady"]);
    for name in ["erring", "panicking", "steady"] {
        rig.manager.load(name).await.unwrap();
    }

    let lines = rig.dispatcher.dispatch(&chan("?go")).await;

    // Only the faulting handlers' contributions are missing.
    assert_eq!(texts(&lines), vec!["still here"]);
    assert_eq!(logged(&log), vec!["steady:"]);
}

#[tokio::test]
async fn unmet_permission_is_indistinguishable_from_no_match() {
    let log = new_log();
    let mut factory = ModuleFactory::new();
    factory.register(
        "gated",
        RecordingModule::ctor(
            "gated",
            "secret",
            Some(PermissionRequirement::Tier(PrivilegeTier::Owner)),
            Some("the answer"),
            log.clone(),
        ),
    );
    let rig = rig(factory, &["gated"]);
    rig.manager.load("gated").await.unwrap();

    let denied = rig.dispatcher.dispatch(&chan("?secret")).await;
    let unknown = rig.dispatcher.dispatch(&chan("?nosuchcommand")).await;

    // Silent skip: no output, no invocation, same shape as an unknown key.
    assert!(denied.is_empty());
    assert_eq!(denied, unknown);
    assert!(logged(&log).is_empty());

    let owner = Sender::new("root").with_tier(PrivilegeTier::Owner);
    let event = ProtocolEvent::channel_message(ServerId(1), owner, "#chat", "?secret");
    assert_eq!(texts(&rig.dispatcher.dispatch(&event).await), vec!["the answer"]);
}

#[tokio::test]
async fn numeric_level_gate_applies_at_dispatch_time() {
    let log = new_log();
    let mut factory = ModuleFactory::new();
    factory.register(
        "gated",
        RecordingModule::ctor(
            "gated",
            "op",
            Some(PermissionRequirement::MinLevel(100)),
            Some("done"),
            log.clone(),
        ),
    );
    let rig = rig(factory, &["gated"]);
    rig.manager.load("gated").await.unwrap();

    let low = Sender::new("low").with_level(99);
    let high = Sender::new("high").with_level(100);
    let low_event = ProtocolEvent::channel_message(ServerId(1), low, "#chat", "?op");
    let high_event = ProtocolEvent::channel_message(ServerId(1), high, "#chat", "?op");

    assert!(rig.dispatcher.dispatch(&low_event).await.is_empty());
    assert_eq!(texts(&rig.dispatcher.dispatch(&high_event).await), vec!["done"]);
}

#[tokio::test]
async fn failed_load_leaves_no_trace() {
    let mut factory = ModuleFactory::new();
    factory.register("bad.init", || Box::new(BadInitModule) as Box<dyn BotModule>);
    let rig = rig(factory, &["missing.entry", "bad.init"]);

    // Entry type the factory cannot resolve.
    let err = rig.manager.load("missing.entry").await.unwrap_err();
    assert!(matches!(err, LoadError::UnknownEntryType(_)));

    // Init failure after the module already made registration requests.
    let err = rig.manager.load("bad.init").await.unwrap_err();
    assert!(matches!(err, LoadError::Init(_)));

    assert_eq!(rig.registry.binding_count(), 0);
    for status in rig.manager.status().await {
        assert_eq!(status.state, SlotState::Unloaded);
    }
    assert!(rig.dispatcher.dispatch(&chan("?doomed")).await.is_empty());
}

#[tokio::test]
async fn echo_scenario() {
    let rig = rig(ModuleFactory::with_builtins(), &["builtin.echo"]);
    rig.manager.load("builtin.echo").await.unwrap();

    let lines = rig.dispatcher.dispatch(&chan("?echo hello")).await;

    assert_eq!(
        lines,
        vec![OutputLine::new(ServerId(1), "#chat", "hello")]
    );
}

#[tokio::test]
async fn wildcard_scenario_failure_is_reported_not_raised() {
    let log = new_log();
    let mut factory = ModuleFactory::new();
    factory.register("url", UrlWatchModule::ctor(log.clone()));
    let rig = rig(factory, &["url"]);
    rig.manager.load("url").await.unwrap();

    let lines = rig
        .dispatcher
        .dispatch(&chan("check this http://example.com/page out"))
        .await;

    assert_eq!(logged(&log), vec!["http://example.com/page"]);
    assert_eq!(texts(&lines), vec!["couldn't fetch http://example.com/page"]);
}

#[tokio::test]
async fn timed_out_handler_counts_as_failed_only_for_itself() {
    let log = new_log();
    let mut factory = ModuleFactory::new();
    factory.register(
        "slow",
        SlowModule::ctor("work", Duration::from_millis(300), "too late"),
    );
    factory.register(
        "quick",
        RecordingModule::ctor("quick", "work", None, Some("on time"), log.clone()),
    );
    let rig = rig_with_timeout(factory, &["slow", "quick"], Duration::from_millis(50));
    rig.manager.load("slow").await.unwrap();
    rig.manager.load("quick").await.unwrap();

    let lines = rig.dispatcher.dispatch(&chan("?work")).await;
    assert_eq!(texts(&lines), vec!["on time"]);
}

#[tokio::test]
async fn greeter_announces_once_per_connection() {
    let rig = rig(ModuleFactory::with_builtins(), &["builtin.greeter"]);
    rig.broker.set(ServerId(1), "server-name", "irc.example.net");
    rig.broker.set(ServerId(1), "home-channel", "#lobby");
    rig.manager.load("builtin.greeter").await.unwrap();

    let bot = Sender::new("rook-bot");
    let connect = ProtocolEvent::named(ServerId(1), bot.clone(), "connect");
    let disconnect = ProtocolEvent::named(ServerId(1), bot.clone(), "disconnect");

    let first = rig.dispatcher.dispatch(&connect).await;
    assert_eq!(
        first,
        vec![OutputLine::new(ServerId(1), "#lobby", "Connected to irc.example.net")]
    );
    // Repeated connect on the same connection stays quiet.
    assert!(rig.dispatcher.dispatch(&connect).await.is_empty());

    // Reconnect re-arms the announcement.
    rig.dispatcher.dispatch(&disconnect).await;
    assert_eq!(rig.dispatcher.dispatch(&connect).await.len(), 1);

    // A server with no home channel configured greets nobody.
    let other = ProtocolEvent::named(ServerId(2), bot, "connect");
    assert!(rig.dispatcher.dispatch(&other).await.is_empty());
}

#[tokio::test]
async fn admin_surface_requires_the_highest_tier() {
    let mut factory = ModuleFactory::new();
    factory.register(
        "rec",
        RecordingModule::ctor("rec", "hello", None, None, new_log()),
    );
    let rig = rig(factory, &["rec"]);

    let plain = Sender::new("mallory").with_tier(PrivilegeTier::Operator);
    let err = rig
        .manager
        .execute_admin(&AdminCommand::Load("rec".to_string()), &plain)
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::PermissionDenied));

    let owner = Sender::new("root").with_tier(PrivilegeTier::Owner);
    rig.manager
        .execute_admin(&AdminCommand::Load("rec".to_string()), &owner)
        .await
        .unwrap();
    assert_eq!(rig.manager.status().await[0].state, SlotState::Active);
}

#[tokio::test]
async fn slow_server_does_not_stall_other_servers() {
    let log = new_log();
    let mut factory = ModuleFactory::new();
    factory.register(
        "slow",
        SlowModule::ctor("slow", Duration::from_millis(300), "slow done"),
    );
    factory.register(
        "fast",
        RecordingModule::ctor("fast", "fast", None, Some("fast done"), log.clone()),
    );
    let rig = rig(factory, &["slow", "fast"]);
    rig.manager.load("slow").await.unwrap();
    rig.manager.load("fast").await.unwrap();

    let collected = Arc::new(Mutex::new(Vec::new()));
    let workers = ServerWorkers::new(
        rig.dispatcher.clone(),
        Arc::new(CollectSink {
            lines: collected.clone(),
        }),
        16,
    );

    let alice = Sender::new("alice");
    workers
        .ingest(ProtocolEvent::channel_message(ServerId(1), alice.clone(), "#a", "?slow"))
        .await;
    workers
        .ingest(ProtocolEvent::channel_message(ServerId(2), alice, "#b", "?fast"))
        .await;

    // The fast server's reply lands while the slow handler still runs.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        collected.lock().unwrap().iter().map(|l| l.text.clone()).collect::<Vec<_>>(),
        vec!["fast done"]
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(collected.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn events_on_one_server_dispatch_in_arrival_order() {
    let log = new_log();
    let mut factory = ModuleFactory::new();
    factory.register(
        "slowish",
        SlowModule::ctor("one", Duration::from_millis(100), "first reply"),
    );
    factory.register(
        "rec",
        RecordingModule::ctor("rec", "two", None, Some("second reply"), log.clone()),
    );
    let rig = rig(factory, &["slowish", "rec"]);
    rig.manager.load("slowish").await.unwrap();
    rig.manager.load("rec").await.unwrap();

    let collected = Arc::new(Mutex::new(Vec::new()));
    let workers = ServerWorkers::new(
        rig.dispatcher.clone(),
        Arc::new(CollectSink {
            lines: collected.clone(),
        }),
        16,
    );

    let alice = Sender::new("alice");
    workers
        .ingest(ProtocolEvent::channel_message(ServerId(1), alice.clone(), "#a", "?one"))
        .await;
    workers
        .ingest(ProtocolEvent::channel_message(ServerId(1), alice, "#a", "?two"))
        .await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        collected.lock().unwrap().iter().map(|l| l.text.clone()).collect::<Vec<_>>(),
        vec!["first reply", "second reply"]
    );
}

#[tokio::test]
async fn one_module_serves_servers_concurrently() {
    let mut factory = ModuleFactory::new();
    factory.register(
        "uneven",
        UnevenModule::ctor("work", ServerId(1), Duration::from_millis(400)),
    );
    let rig = rig(factory, &["uneven"]);
    rig.manager.load("uneven").await.unwrap();

    let collected = Arc::new(Mutex::new(Vec::new()));
    let workers = ServerWorkers::new(
        rig.dispatcher.clone(),
        Arc::new(CollectSink {
            lines: collected.clone(),
        }),
        16,
    );

    let alice = Sender::new("alice");
    workers
        .ingest(ProtocolEvent::channel_message(ServerId(1), alice.clone(), "#a", "?work"))
        .await;
    workers
        .ingest(ProtocolEvent::channel_message(ServerId(2), alice, "#b", "?work"))
        .await;

    // Server 2's reply lands while the same module still sleeps on server 1.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        collected.lock().unwrap().iter().map(|l| l.text.clone()).collect::<Vec<_>>(),
        vec!["done on 2"]
    );

    tokio::time::sleep(Duration::from_millis(400)).await;
    let mut replies: Vec<String> = collected.lock().unwrap().iter().map(|l| l.text.clone()).collect();
    replies.sort();
    assert_eq!(replies, vec!["done on 1", "done on 2"]);
}

#[tokio::test]
async fn unload_waits_for_in_flight_invocation() {
    let mut factory = ModuleFactory::new();
    factory.register(
        "slow",
        SlowModule::ctor("work", Duration::from_millis(300), "finished"),
    );
    let rig = rig(factory, &["slow"]);
    rig.manager.load("slow").await.unwrap();

    let dispatcher = rig.dispatcher.clone();
    let task = tokio::spawn(async move { dispatcher.dispatch(&chan("?work")).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Unload returns only after the running handler has come back.
    rig.manager.unload("slow").await.unwrap();
    assert_eq!(rig.manager.status().await[0].state, SlotState::Unloaded);

    let lines = task.await.unwrap();
    assert_eq!(texts(&lines), vec!["finished"]);
}

#[tokio::test]
async fn destroying_a_context_twice_is_a_noop() {
    ensure_init();
    let factory = ModuleFactory::with_builtins();
    let context = IsolationContext::create(
        ContextId(0),
        TrustLevel::Restricted,
        Duration::from_secs(5),
    );
    let caps = HostCapabilities {
        vars: Arc::new(VariableBroker::new()),
        admin: None,
    };
    let descriptor = ModuleDescriptor::new("builtin.echo", "builtin.echo");
    context.load(&factory, &descriptor, &caps).unwrap();
    assert_eq!(context.state(), ContextState::Active);

    context.destroy().await;
    assert_eq!(context.state(), ContextState::Destroyed);
    context.destroy().await;
    assert_eq!(context.state(), ContextState::Destroyed);

    let call = HandlerCall {
        handle: CallbackHandle(0),
        server_id: ServerId(1),
        channel: Some("#chat".to_string()),
        sender_nick: "alice".to_string(),
        args: "hi".to_string(),
        raw: "?echo hi".to_string(),
    };
    let err = context
        .invoke(serde_json::to_value(call).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::ContextGone));
}

//! Process-wide registry tests.
//!
//! Kept to a single test in its own binary so the registry starts empty and
//! the steps run in a fixed order.

use std::io;
use std::sync::{Arc, Mutex};

use ctxwire::namespace::NamespaceCodec;
use ctxwire::{
    configure_global_registry, context_marshaler_count, context_unmarshaler_count,
    marshal_context, register_context_codec, register_context_marshaler,
    register_context_unmarshaler, unmarshal_context, Context, ContextError, ContextKey,
    ContextValues, RegistryConfig, WireValue,
};
use tracing_subscriber::fmt::MakeWriter;

// The string key used to marshal ContextTestKeyOne
const CONTEXT_TEST_KEY_ONE_STR: &str = "test_context_one";

struct ContextTestKeyOne;

impl ContextKey for ContextTestKeyOne {
    type Value = String;
    const NAME: &'static str = "context_test_one";
}

fn with_context_test_one(ctx: &Context, val: &str) -> Context {
    ctx.with_value::<ContextTestKeyOne>(val.to_string())
}

fn context_test_one(ctx: &Context) -> Option<String> {
    ctx.value::<ContextTestKeyOne>().cloned()
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let bytes = logs.0.lock().unwrap().clone();
    (result, String::from_utf8(bytes).unwrap())
}

#[test]
fn test_global_context_registry() {
    assert_eq!(context_marshaler_count(), 0, "there should be no context marshalers");
    assert_eq!(context_unmarshaler_count(), 0, "there should be no context unmarshalers");

    register_context_marshaler(|ctx: &Context, vals: &mut ContextValues| {
        if let Some(val) = context_test_one(ctx) {
            vals.insert(CONTEXT_TEST_KEY_ONE_STR.to_string(), WireValue::String(val));
        }
    })
    .unwrap();
    assert_eq!(context_marshaler_count(), 1);
    assert_eq!(context_unmarshaler_count(), 0);

    let vals = marshal_context(&Context::background());
    assert!(
        !vals.contains_key(CONTEXT_TEST_KEY_ONE_STR),
        "marshaled values should be empty: {:?}",
        vals
    );

    let ctx = with_context_test_one(&Context::background(), "testval");
    let vals = marshal_context(&ctx);
    let mut expected = ContextValues::new();
    expected.insert(CONTEXT_TEST_KEY_ONE_STR.to_string(), WireValue::from("testval"));
    assert_eq!(vals, expected);

    // Late registration is allowed by default, with a warning
    let (result, logs) = capture_logs(|| {
        register_context_unmarshaler(|ctx: Context, vals: &ContextValues| {
            match vals.get(CONTEXT_TEST_KEY_ONE_STR).and_then(WireValue::as_str) {
                Some(val) => with_context_test_one(&ctx, val),
                None => ctx,
            }
        })
    });
    result.unwrap();
    assert!(logs.contains("Context registration after first use"), "logs: {}", logs);
    assert!(logs.contains("kind=\"unmarshaler\""), "logs: {}", logs);
    assert_eq!(context_unmarshaler_count(), 1);

    let ctx = unmarshal_context(&ContextValues::new());
    assert_eq!(context_test_one(&ctx), None, "unmarshaled context should be empty: {:?}", ctx);

    let ctx = unmarshal_context(&expected);
    assert_eq!(context_test_one(&ctx), Some("testval".to_string()));

    // Registered functions run without the registry lock held, so they may
    // read it and even reconfigure it
    register_context_marshaler(|_: &Context, vals: &mut ContextValues| {
        let registered = context_marshaler_count() as i64;
        vals.insert("registered_marshalers".to_string(), registered.into());
        configure_global_registry(RegistryConfig::default());
    })
    .unwrap();

    let vals = marshal_context(&with_context_test_one(&Context::background(), "testval"));
    assert_eq!(vals.get("registered_marshalers"), Some(&WireValue::Int(2)));
    assert_eq!(vals.get(CONTEXT_TEST_KEY_ONE_STR), Some(&WireValue::from("testval")));

    configure_global_registry(RegistryConfig {
        strict_registration: true,
        ..RegistryConfig::default()
    });
    let (result, logs) = capture_logs(|| register_context_codec(NamespaceCodec));
    assert!(matches!(result, Err(ContextError::LateRegistration { kind: "codec" })));
    assert!(logs.contains("Rejected context registration after first use"), "logs: {}", logs);
    assert_eq!(context_marshaler_count(), 2);
    assert_eq!(context_unmarshaler_count(), 1);
}

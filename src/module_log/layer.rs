//! Tracing layer feeding the module log view
//!
//! Application `tracing` events land in a [`ModuleLogView`], grouped by the first
//! segment of the event target (`shop::cart` → `shop`).

use super::view::ModuleLogView;
use crate::Context;
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{layer::Context as LayerContext, registry::LookupSpan, Layer};

/// Targets never mirrored, so the view's own diagnostics cannot feed back into it
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

pub struct ModuleLogLayer {
    view: Arc<ModuleLogView>,
}

impl ModuleLogLayer {
    pub fn new(view: Arc<ModuleLogView>) -> Self {
        Self { view }
    }
}

/// Module name for an event target
pub fn module_for_target(target: &str) -> &str {
    target.split("::").next().unwrap_or(target)
}

/// Level names as used by module logs
pub fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "error",
        Level::WARN => "warning",
        Level::INFO => "info",
        Level::DEBUG => "debug",
        _ => "trace",
    }
}

impl<S> Layer<S> for ModuleLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let metadata = event.metadata();
        let module = module_for_target(metadata.target());
        if module == OWN_TARGET {
            return;
        }

        struct FieldVisitor {
            message: Option<String>,
            fields: Context,
        }

        impl tracing::field::Visit for FieldVisitor {
            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                let value_str = format!("{:?}", value);
                if field.name() == "message" {
                    self.message = Some(value_str);
                } else {
                    self.fields
                        .insert(field.name().to_string(), serde_json::Value::String(value_str));
                }
            }

            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = Some(value.to_string());
                } else {
                    self.fields.insert(
                        field.name().to_string(),
                        serde_json::Value::String(value.to_string()),
                    );
                }
            }

            fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
                self.fields.insert(field.name().to_string(), value.into());
            }

            fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
                self.fields.insert(field.name().to_string(), value.into());
            }

            fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
                self.fields.insert(field.name().to_string(), value.into());
            }

            fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
                self.fields.insert(field.name().to_string(), value.into());
            }
        }

        let mut visitor = FieldVisitor {
            message: None,
            fields: Context::new(),
        };
        event.record(&mut visitor);

        self.view.log(
            module,
            level_name(metadata.level()),
            visitor.message.unwrap_or_default(),
            visitor.fields,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_log::DEFAULT_LOG_LIMIT;
    use tracing_subscriber::prelude::*;

    #[test]
    fn test_events_are_grouped_by_module() {
        let view = Arc::new(ModuleLogView::default());
        let subscriber = tracing_subscriber::registry().with(ModuleLogLayer::new(view.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "shop::cart", items = 3, "cart is large");
            tracing::error!(target: "auth", user = "bob", "bad login");
            tracing::info!(target: "devtools::query::profiler", "ignored");
        });

        let cart = view.logs("shop", None, DEFAULT_LOG_LIMIT);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].level, "warning");
        assert_eq!(cart[0].message, "cart is large");
        assert_eq!(cart[0].context["items"], 3);

        let auth = view.logs("auth", Some("error"), DEFAULT_LOG_LIMIT);
        assert_eq!(auth[0].context["user"], "bob");

        assert_eq!(view.modules(), ["shop", "auth"]);
    }

    #[test]
    fn test_module_for_target() {
        assert_eq!(module_for_target("shop::cart::checkout"), "shop");
        assert_eq!(module_for_target("auth"), "auth");
    }
}

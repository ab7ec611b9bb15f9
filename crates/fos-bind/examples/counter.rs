//! Example: a counter bound both ways
//!
//! Run with `RUST_LOG=fos_bind=debug` to see every flow.

use fos_bind::dom::{Document, DocumentHandle};
use fos_bind::{Context, Engine, Model, Options, Scope, SetOptions, Subject, UpdateChannel};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let counter = Model::new().with("count", 0).with("step", "1");
    counter.define_method("increment", |model, args| {
        let step = args
            .first()
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(1);
        let next = model.get("count").and_then(|v| v.as_i64()).unwrap_or(0) + step;
        model.set("count", json!(next), SetOptions::default())?;
        Ok(json!(next))
    });

    let document = DocumentHandle::new(Document::new());
    let (label, input, button) = {
        let mut doc = document.borrow_mut();
        let body = doc.body();

        let label = doc.append_element(body, "span");
        doc.set_attribute(label, "id", "count");
        doc.set_attribute(label, "bind-subscribe", "counter.change:count");
        doc.set_attribute(label, "bind-set-value", "counter:count");
        doc.set_attribute(label, "bind-auto-render", "true");

        let input = doc.append_element(body, "input");
        doc.set_attribute(input, "bind-publish", "counter:step");

        let button = doc.append_element(body, "button");
        doc.set_attribute(button, "bind-publish", "counter:clicked");
        doc.append_text(button, "+");
        (label, input, button)
    };

    let context = Context::builder().subject("counter", counter.clone()).build();
    let options = Options::default().with_debug(true);
    let engine = Engine::new(Scope::document(document.clone()), context, options)?;
    engine.on_update(UpdateChannel::Element("count".into()), |update| {
        println!("count is now {}", update.value);
    });

    document.change(input, "5")?;
    let step = counter.get("step").unwrap_or(Value::Null);
    for _ in 0..3 {
        document.click(button)?;
        engine.resolve(&format!("counter:increment:{}", step.as_str().unwrap_or("1")))?;
        engine.queue().run_until_idle();
    }

    println!("fOS Bind v{}: label shows {}", fos_bind::VERSION, document.borrow().inner_html(label));
    Ok(())
}

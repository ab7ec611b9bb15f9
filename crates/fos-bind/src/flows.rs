//! Built-in flow handlers

use crate::{BindError, BoundElement, Session, Trigger};

/// Initial render at setup
pub(crate) fn auto_render(session: &Session, bound: &BoundElement, _: &Trigger<'_>) -> Result<(), BindError> {
    if session.options().debug {
        tracing::debug!(node = %bound.node, identity = %bound.identity, "auto-render");
    }
    session.render(bound)?;
    Ok(())
}

/// Model → DOM
///
/// Skips events tagged with the element's own identity: those come from the
/// element's own publish and the DOM already shows the value.
pub(crate) fn render(session: &Session, bound: &BoundElement, trigger: &Trigger<'_>) -> Result<(), BindError> {
    if trigger.source() == Some(bound.identity.as_str()) {
        if session.options().debug {
            tracing::debug!(node = %bound.node, identity = %bound.identity, "ignoring own change");
        }
        return Ok(());
    }
    if session.options().debug {
        tracing::debug!(node = %bound.node, identity = %bound.identity, "render");
    }
    session.render(bound)?;
    Ok(())
}

/// DOM → model
pub(crate) fn publish(session: &Session, bound: &BoundElement, trigger: &Trigger<'_>) -> Result<(), BindError> {
    let value = session.effective_value(bound, trigger);
    if session.options().debug {
        tracing::debug!(node = %bound.node, identity = %bound.identity, %value, "publish");
    }
    session.publish_value(bound, value)
}

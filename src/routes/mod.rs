/// Router Module Index
///
/// Routes are split by how the gate treats them. Public routes sit outside the gate's
/// matcher; authenticated routes live under an intercepted prefix and only ever see
/// requests the gate has already allowed.

/// Routes every client may call: health probe and the forward-auth check.
pub mod public;

/// Routes behind the gate middleware. Handlers receive the verified `AuthUser`.
pub mod authenticated;

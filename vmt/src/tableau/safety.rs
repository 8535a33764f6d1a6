//! Safety-LTL encoder (§4.4.4): a safety property holds over an infinite
//! trace iff it holds over every finite prefix, so once a formula is
//! confirmed safety it can be checked by the LTLf tableau after weakening
//! every strong `X` to a weak `N` (a finite prefix has no obligation to
//! produce a successor state).

use super::ltlf::encode_ltlf;
use crate::error::{Result, VmtError};
use crate::model::Model;
use crate::rewrite::{is_safety_ltl, nnf, weaken_x};
use crate::term::Term;

/// Encode `phi` against `model` via the safety-LTL tableau. Fails with
/// [`VmtError::NotSafetyLtl`] if `phi` is not safety (i.e. its NNF contains
/// a positive `U` or `F`) rather than silently delegating to a different
/// encoder.
pub fn encode_safety(model: &Model, phi: Term) -> Result<Model> {
    let env = model.env().clone();
    let normal = nnf(&env, phi)?;
    if !is_safety_ltl(normal) {
        return Err(VmtError::NotSafetyLtl);
    }
    tracing::debug!("encoding safety-LTL tableau");
    let weakened = weaken_x(&env, normal)?;
    encode_ltlf(model, weakened)
}

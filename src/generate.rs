//! Random string generation by walking the NFA.
//!
//! The symmetric execution mode: one traversal, no fan-out. A Split
//! picks one outgoing edge uniformly, matchers sample their sets, and
//! negated classes accumulate forbidden sets that `EndPeek` complements.

use crate::nfa::{self, GenSource, Nfa, NodeKind};
use crate::types::{Error, Options};
use crate::uniset::Uniset;
use log::trace;
use rand::Rng;
use std::time::Instant;

pub(crate) fn run<R: Rng + ?Sized>(
    nfa: &Nfa,
    rng: &mut R,
    opts: &Options,
) -> Result<String, Error> {
    let deadline = Instant::now() + opts.timeout;
    let mut out = String::new();
    // The forbidden-set accumulator, live between BeginPeek and EndPeek.
    let mut gather: Option<Uniset> = None;
    let mut id = nfa::START;
    loop {
        if Instant::now() >= deadline {
            return Err(Error::Timeout(opts.timeout));
        }
        let node = &nfa.nodes()[id as usize];
        match &node.kind {
            NodeKind::Start | NodeKind::BeginGroup(_) | NodeKind::EndGroup => {}

            NodeKind::Split => {
                // One child, chosen uniformly; the executor's fan-out
                // does not apply while generating.
                let pick = rng.gen_range(0..node.out.len());
                id = node.out[pick];
                continue;
            }

            NodeKind::Match { gen, .. } => match gen {
                GenSource::Pick(set) => {
                    // A set with nothing to offer leaves the state unchanged.
                    if let Some(cp) = set.pick(rng) {
                        if let Some(c) = char::from_u32(cp) {
                            out.push(c);
                        }
                    }
                }
                GenSource::Gather(set) => {
                    let acc = gather.take().unwrap_or_else(Uniset::none);
                    gather = Some(acc.union(set.clone()));
                }
            },

            NodeKind::BeginPeek => {
                gather = Some(Uniset::none());
            }

            NodeKind::EndPeek => {
                let Some(acc) = gather.take() else {
                    return Err(Error::Protocol("peek ended without an accumulator"));
                };
                if let Some(cp) = acc.pick_neg(rng) {
                    if let Some(c) = char::from_u32(cp) {
                        out.push(c);
                    }
                }
            }

            NodeKind::Success => {
                trace!("generated {} code points", out.chars().count());
                return Ok(out);
            }
        }
        match node.out.first() {
            Some(&next) => id = next,
            None => return Err(Error::Protocol("node with no downstream wiring")),
        }
    }
}

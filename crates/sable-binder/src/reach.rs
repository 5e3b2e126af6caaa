//! Reachability analysis.
//!
//! Runs per block after the fixed point completes. Statements get their
//! `instantiated` flag, unreachable statements are reported, functions that
//! can fall off their end get a synthesized `return;` (`return 0;` at the
//! program root), and value-returning paths that fall through are errors.
//! An iterator whose body never reaches a yield is an error.

use sable_common::{BindError, BlockId, ErrorKind, Loc, SigId, StmtId};
use sable_tree::{FuncKind, StmtFlags, StmtKind};
use sable_types::TypeId;

use crate::state::Binder;

/// What control flow does after a block: whether it can fall out of the
/// end, and whether some path through it returns.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Flow {
    pub falls: bool,
    pub returns: bool,
}

impl Binder<'_> {
    pub(crate) fn check_reachability(&mut self) -> Result<(), BindError> {
        for index in 0..self.prog.sigs.len() {
            let sig = SigId(index as u32);
            let (instantiated, partial, body, func) = {
                let s = self.prog.sigs.get(sig);
                (s.instantiated, s.partial, s.body, s.func)
            };
            if !instantiated || partial {
                continue;
            }
            let Some(body) = body else { continue };
            let flow = self.analyze_block(body)?;
            let kind = self.prog.funcs.get(func).kind;
            let ret = self.prog.sigs.get(sig).ret.unwrap_or(TypeId::NONE);

            if kind == FuncKind::Iterator {
                if !self.has_reachable_yield(body) {
                    return Err(BindError::new(
                        ErrorKind::Reachability,
                        self.prog.funcs.get(func).loc,
                        "iterator body never executes a yield",
                    ));
                }
                continue;
            }
            if flow.falls {
                if sig == self.root_sig {
                    self.synthesize_root_return(sig, body);
                } else if ret != TypeId::NONE {
                    return Err(BindError::new(
                        ErrorKind::Reachability,
                        self.prog.funcs.get(func).loc,
                        "control can fall off the end of a value-returning function",
                    ));
                } else {
                    self.synthesize_return(body);
                }
            }
        }
        Ok(())
    }

    /// Walk a block's statements in order, marking each reachable one and
    /// reporting anything after a terminator.
    pub(crate) fn analyze_block(&mut self, block: BlockId) -> Result<Flow, BindError> {
        let stmts = self.prog.blocks.get(block).stmts.clone();
        let mut flow = Flow {
            falls: true,
            returns: false,
        };
        let mut index = 0;
        while index < stmts.len() {
            let stmt = stmts[index];
            if !flow.falls {
                return Err(BindError::new(
                    ErrorKind::Reachability,
                    self.prog.stmts.get(stmt).loc,
                    "unreachable statement",
                ));
            }
            self.prog
                .stmts
                .get_mut(stmt)
                .flags
                .set(StmtFlags::INSTANTIATED);
            let kind = self.prog.stmts.get(stmt).kind.clone();
            match kind {
                StmtKind::Return => {
                    flow.falls = false;
                    flow.returns = true;
                }
                StmtKind::Throw => flow.falls = false,
                StmtKind::If => {
                    // Consume the whole if/elseif/else chain.
                    let mut chain = self.analyze_sub(stmt)?;
                    let mut has_else = false;
                    let mut next = index + 1;
                    while next < stmts.len() {
                        let sibling = stmts[next];
                        match self.prog.stmts.get(sibling).kind {
                            StmtKind::ElseIf => {
                                self.prog
                                    .stmts
                                    .get_mut(sibling)
                                    .flags
                                    .set(StmtFlags::INSTANTIATED);
                                let arm = self.analyze_sub(sibling)?;
                                chain.falls |= arm.falls;
                                chain.returns |= arm.returns;
                                next += 1;
                            }
                            StmtKind::Else => {
                                self.prog
                                    .stmts
                                    .get_mut(sibling)
                                    .flags
                                    .set(StmtFlags::INSTANTIATED);
                                let arm = self.analyze_sub(sibling)?;
                                chain.falls |= arm.falls;
                                chain.returns |= arm.returns;
                                has_else = true;
                                next += 1;
                                break;
                            }
                            _ => break,
                        }
                    }
                    flow.falls = chain.falls || !has_else;
                    flow.returns |= chain.returns;
                    index = next;
                    continue;
                }
                StmtKind::Switch => {
                    let sub = self.prog.stmts.get(stmt).block.expect("switch block");
                    let arms = self.prog.blocks.get(sub).stmts.clone();
                    let mut any_falls = false;
                    for arm in arms {
                        self.prog
                            .stmts
                            .get_mut(arm)
                            .flags
                            .set(StmtFlags::INSTANTIATED);
                        let arm_flow = self.analyze_sub(arm)?;
                        any_falls |= arm_flow.falls;
                        flow.returns |= arm_flow.returns;
                    }
                    flow.falls = any_falls;
                }
                StmtKind::Typeswitch => {
                    let sub = self.prog.stmts.get(stmt).block.expect("typeswitch block");
                    let arms = self.prog.blocks.get(sub).stmts.clone();
                    for arm in arms {
                        if self.prog.stmts.get(arm).flags.has(StmtFlags::INSTANTIATED) {
                            let arm_flow = self.analyze_sub(arm)?;
                            flow.falls = arm_flow.falls;
                            flow.returns |= arm_flow.returns;
                            break;
                        }
                    }
                }
                StmtKind::DoWhile => {
                    // The body runs at least once.
                    let body_flow = self.analyze_sub(stmt)?;
                    flow.falls = body_flow.falls;
                    flow.returns |= body_flow.returns;
                }
                StmtKind::For { init, update } => {
                    for clause in [init, update] {
                        self.prog
                            .stmts
                            .get_mut(clause)
                            .flags
                            .set(StmtFlags::INSTANTIATED);
                    }
                    let body_flow = self.analyze_sub(stmt)?;
                    flow.returns |= body_flow.returns;
                }
                StmtKind::While | StmtKind::Foreach { .. } => {
                    // The loop may run zero times; control always falls
                    // past it.
                    let body_flow = self.analyze_sub(stmt)?;
                    flow.returns |= body_flow.returns;
                }
                StmtKind::Block | StmtKind::Generate | StmtKind::Else | StmtKind::ElseIf => {
                    let body_flow = self.analyze_sub(stmt)?;
                    flow.falls = body_flow.falls;
                    flow.returns |= body_flow.returns;
                }
                _ => {}
            }
            index += 1;
        }
        let b = self.prog.blocks.get_mut(block);
        b.can_continue = flow.falls;
        b.can_return = flow.returns;
        Ok(flow)
    }

    fn analyze_sub(&mut self, stmt: StmtId) -> Result<Flow, BindError> {
        match self.prog.stmts.get(stmt).block {
            Some(block) => self.analyze_block(block),
            None => Ok(Flow {
                falls: true,
                returns: false,
            }),
        }
    }

    pub(crate) fn has_reachable_yield(&self, block: BlockId) -> bool {
        let stmts = &self.prog.blocks.get(block).stmts;
        for &stmt in stmts {
            let s = self.prog.stmts.get(stmt);
            if !s.flags.has(StmtFlags::INSTANTIATED) {
                continue;
            }
            if matches!(s.kind, StmtKind::Yield) {
                return true;
            }
            if let Some(sub) = s.block {
                if self.has_reachable_yield(sub) {
                    return true;
                }
            }
        }
        false
    }

    fn synthesize_return(&mut self, body: BlockId) {
        let stmt = self
            .prog
            .stmt_in(body, StmtKind::Return, None, Loc::synthetic());
        self.prog
            .stmts
            .get_mut(stmt)
            .flags
            .set(StmtFlags::INSTANTIATED);
        self.prog.blocks.get_mut(body).can_continue = false;
        self.prog.blocks.get_mut(body).can_return = true;
    }

    /// The program root returns 0 on success.
    fn synthesize_root_return(&mut self, sig: SigId, body: BlockId) {
        let zero = self.prog.e_int_typed(0, 32, true, Loc::synthetic());
        self.prog.exprs.get_mut(zero).ty = Some(TypeId::I32);
        let stmt = self
            .prog
            .stmt_in(body, StmtKind::Return, Some(zero), Loc::synthetic());
        self.prog
            .stmts
            .get_mut(stmt)
            .flags
            .set(StmtFlags::INSTANTIATED);
        if self.prog.sigs.get(sig).ret == Some(TypeId::NONE) {
            self.prog.sigs.get_mut(sig).ret = Some(TypeId::I32);
        }
        self.prog.blocks.get_mut(body).can_continue = false;
        self.prog.blocks.get_mut(body).can_return = true;
    }
}

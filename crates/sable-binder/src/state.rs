//! Binder state: the event queue, the task list, and the fixed-point work
//! loop.
//!
//! Binding is event-driven. Each (signature, statement) pair is one task. A
//! task that cannot complete parks itself on an event - an undefined
//! identifier, a variable whose datatype is still unrefined, or a callee
//! signature whose return type is unknown - and yields back to the work
//! loop. Firing an event re-enqueues every parked task FIFO. Tasks that
//! completed but read a still-refinable datatype subscribe to the same
//! events and re-run from scratch when the datatype refines; re-binding a
//! statement is idempotent, which is what makes multiple wake-ups safe.
//!
//! Termination: every wake-up strictly refines at least one monotone state
//! (a datatype becomes more refined, a signature becomes bound, or an
//! identifier becomes defined), and the refinement lattice is finite for
//! any given program. If the queue drains while parked tasks remain, the
//! binder reports the cycle.

use rustc_hash::FxHashMap;
use sable_common::{Atom, BindError, BlockId, ErrorKind, FuncId, SigId, StmtId, TclassId, VarId};
use sable_tree::{Program, StmtKind};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Something a task can wait for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Event {
    /// An identifier with this name became defined in some scope.
    Ident(Atom),
    /// A variable's datatype was set or refined.
    Var(VarId),
    /// A signature's return type was set or refined.
    Sig(SigId),
}

/// Why an expression or statement could not finish binding.
#[derive(Debug)]
pub(crate) enum BindFailure {
    /// Park on this event and retry when it fires.
    Blocked(Event),
    /// Fatal semantic error; the pass halts.
    Error(BindError),
}

impl From<BindError> for BindFailure {
    fn from(err: BindError) -> Self {
        BindFailure::Error(err)
    }
}

pub(crate) type BindResult<T> = Result<T, BindFailure>;

pub(crate) type TaskId = usize;

/// One statement-binding task under one signature.
#[derive(Debug)]
pub(crate) struct Task {
    pub sig: SigId,
    pub stmt: StmtId,
    /// The block the statement sits in; binding scope starts here.
    pub block: BlockId,
    /// Currently in the ready queue.
    pub queued: bool,
    /// Completed at least once (used for per-signature completion counts).
    pub completed: bool,
    /// The event this task is parked on, if any.
    pub blocked_on: Option<Event>,
}

/// The binder. Owns the work queue and drives every pass; the program graph
/// is the single shared mutable resource and the binder its only writer.
pub struct Binder<'p> {
    pub(crate) prog: &'p mut Program,
    pub(crate) tasks: Vec<Task>,
    pub(crate) queue: VecDeque<TaskId>,
    pub(crate) waiters: FxHashMap<Event, Vec<TaskId>>,
    /// Outstanding (never-completed) tasks per signature.
    pub(crate) pending: FxHashMap<SigId, usize>,
    /// Deferred same-tclass constructor signatures, drained when the outer
    /// constructor finishes.
    pub(crate) lazy_ctors: FxHashMap<TclassId, Vec<SigId>>,
    pub(crate) root_sig: SigId,
    pub(crate) current: TaskId,
    /// Binding an operand whose path needs no runtime value (typeof,
    /// widthof, cast targets): variables read here are not marked
    /// instantiated.
    pub(crate) type_context: bool,
    /// Lazily-created builtin `length()` of arrays and strings.
    pub(crate) builtin_length: Option<FuncId>,
}

impl<'p> Binder<'p> {
    pub fn new(prog: &'p mut Program) -> Self {
        Binder {
            prog,
            tasks: Vec::new(),
            queue: VecDeque::new(),
            waiters: FxHashMap::default(),
            pending: FxHashMap::default(),
            lazy_ctors: FxHashMap::default(),
            root_sig: SigId(0),
            current: 0,
            type_context: false,
            builtin_length: None,
        }
    }

    /// Run the whole binding pipeline: fixed-point statement binding,
    /// reachability, iterator inlining, constant propagation.
    pub fn run(mut self) -> Result<(), BindError> {
        self.root_sig = self.create_root_sig();
        self.enqueue_sig_body(self.root_sig);
        self.fixed_point()?;
        self.check_reachability()?;
        self.inline_iterators()?;
        self.propagate_constants()?;
        Ok(())
    }

    // =========================================================================
    // Task management
    // =========================================================================

    /// Create a task for one statement and put it on the ready queue.
    pub(crate) fn spawn_task(&mut self, sig: SigId, stmt: StmtId, block: BlockId) {
        let id = self.tasks.len();
        self.tasks.push(Task {
            sig,
            stmt,
            block,
            queued: true,
            completed: false,
            blocked_on: None,
        });
        *self.pending.entry(sig).or_insert(0) += 1;
        self.queue.push_back(id);
        trace!(task = id, ?stmt, "spawn");
    }

    /// Enqueue binding tasks for every statement of a signature's body,
    /// pre-order through nested blocks. Case arms are driven by their
    /// parent switch task, and typeswitch arms are only enqueued once the
    /// typeswitch selects one.
    pub(crate) fn enqueue_sig_body(&mut self, sig: SigId) {
        if let Some(body) = self.prog.sigs.get(sig).body {
            self.enqueue_block(sig, body);
            self.maybe_finish_sig(sig);
        }
    }

    pub(crate) fn enqueue_block(&mut self, sig: SigId, block: BlockId) {
        let stmts = self.prog.blocks.get(block).stmts.clone();
        for stmt in stmts {
            self.enqueue_stmt(sig, stmt, block);
        }
    }

    pub(crate) fn enqueue_stmt(&mut self, sig: SigId, stmt: StmtId, block: BlockId) {
        let (is_case, is_typeswitch, sub) = {
            let s = self.prog.stmts.get(stmt);
            (
                matches!(s.kind, StmtKind::Case | StmtKind::Default),
                matches!(s.kind, StmtKind::Typeswitch),
                s.block,
            )
        };
        // Case arms have no task of their own: the parent switch task binds
        // their case expressions.
        if !is_case {
            self.spawn_task(sig, stmt, block);
        }
        // Typeswitch arms are compile-time selected; the typeswitch task
        // enqueues exactly the one it picks.
        if is_typeswitch {
            return;
        }
        if let Some(sub) = sub {
            self.enqueue_block(sig, sub);
        }
    }

    /// Park the current task on an event.
    pub(crate) fn park(&mut self, task: TaskId, event: Event) {
        self.tasks[task].blocked_on = Some(event);
        self.waiters.entry(event).or_default().push(task);
        trace!(task, ?event, "park");
    }

    /// Subscribe the current task to a refinement event without blocking:
    /// it completed with a still-refinable datatype and must re-run when
    /// the event fires.
    pub(crate) fn subscribe(&mut self, event: Event) {
        let task = self.current;
        let waiters = self.waiters.entry(event).or_default();
        if !waiters.contains(&task) {
            waiters.push(task);
        }
    }

    /// Fire an event: move every waiter back onto the ready queue, FIFO.
    pub(crate) fn fire(&mut self, event: Event) {
        if let Some(waiters) = self.waiters.remove(&event) {
            debug!(?event, count = waiters.len(), "fire");
            for task in waiters {
                let t = &mut self.tasks[task];
                t.blocked_on = None;
                if !t.queued {
                    t.queued = true;
                    self.queue.push_back(task);
                }
            }
        }
    }

    // =========================================================================
    // The fixed point
    // =========================================================================

    pub(crate) fn fixed_point(&mut self) -> Result<(), BindError> {
        while let Some(task) = self.queue.pop_front() {
            self.tasks[task].queued = false;
            self.current = task;
            let sig = self.tasks[task].sig;
            let stmt = self.tasks[task].stmt;
            let block = self.tasks[task].block;
            match self.bind_stmt(sig, stmt, block) {
                Ok(()) => {
                    if !self.tasks[task].completed {
                        self.tasks[task].completed = true;
                        let left = self.pending.get_mut(&sig).expect("pending count");
                        *left -= 1;
                        if *left == 0 {
                            self.finish_sig(sig);
                        }
                    }
                }
                Err(BindFailure::Blocked(event)) => self.park(task, event),
                Err(BindFailure::Error(err)) => return Err(err),
            }
        }
        self.report_stuck_tasks()
    }

    /// The queue drained. If tasks are still parked, no event can ever fire
    /// again: report the cycle at the earliest-created stuck task.
    fn report_stuck_tasks(&self) -> Result<(), BindError> {
        for task in &self.tasks {
            let Some(event) = task.blocked_on else {
                continue;
            };
            let loc = self.prog.stmts.get(task.stmt).loc;
            return Err(match event {
                Event::Ident(name) => BindError::new(
                    ErrorKind::UndefinedIdentifier,
                    loc,
                    format!("undefined identifier '{}'", self.prog.strings.resolve(name)),
                ),
                Event::Var(var) => BindError::new(
                    ErrorKind::CyclicDependency,
                    loc,
                    format!(
                        "cannot resolve type of '{}'",
                        self.prog.strings.resolve(self.prog.vars.get(var).name)
                    ),
                ),
                Event::Sig(sig) => BindError::new(
                    ErrorKind::CyclicDependency,
                    loc,
                    format!(
                        "cannot resolve return type of '{}'",
                        self.prog
                            .strings
                            .resolve(self.prog.funcs.get(self.prog.sigs.get(sig).func).name)
                    ),
                ),
            });
        }
        Ok(())
    }
}

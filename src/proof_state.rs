use std::fmt;

use fxhash::FxHashSet;
use im::{OrdMap, Vector};
use nohash_hasher::IntMap;
use tracing::debug;

use crate::error::{KernelError, Result};
use crate::term::TermRef;
use crate::types::Type;

/// A handle into the proof context's arena. The context owns every state;
/// ids are stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(pub usize);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A named assumption in force at a proof state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hypothesis {
    name: String,
    formula: TermRef,
}

impl Hypothesis {
    pub fn new(name: &str, formula: TermRef) -> Hypothesis {
        Hypothesis {
            name: name.to_string(),
            formula,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formula(&self) -> &TermRef {
        &self.formula
    }
}

impl fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.formula)
    }
}

/// The record of a rule application: which rule, which hypotheses it used,
/// and what it concluded. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofStep {
    rule_name: String,
    premise_names: Vec<String>,
    conclusion: TermRef,
}

impl ProofStep {
    pub fn new(rule_name: &str, premise_names: Vec<String>, conclusion: TermRef) -> ProofStep {
        ProofStep {
            rule_name: rule_name.to_string(),
            premise_names,
            conclusion,
        }
    }

    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    pub fn premise_names(&self) -> &[String] {
        &self.premise_names
    }

    pub fn conclusion(&self) -> &TermRef {
        &self.conclusion
    }
}

/// How a state came to be considered settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificationStatus {
    Unproved,
    ProvedByRule,
    Contradiction,
    PendingInstantiation,
}

impl CertificationStatus {
    /// Whether the status is final. A certification may be set once, from
    /// `Unproved` to any terminal status.
    pub fn is_terminal(&self) -> bool {
        *self != CertificationStatus::Unproved
    }

    /// Whether the status by itself establishes the goal.
    pub fn is_proved(&self) -> bool {
        matches!(
            self,
            CertificationStatus::ProvedByRule | CertificationStatus::Contradiction
        )
    }
}

impl fmt::Display for CertificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            CertificationStatus::Unproved => "unproved",
            CertificationStatus::ProvedByRule => "proved by rule",
            CertificationStatus::Contradiction => "contradiction",
            CertificationStatus::PendingInstantiation => "pending instantiation",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certification {
    pub status: CertificationStatus,
    pub justification: String,
}

impl Default for Certification {
    fn default() -> Certification {
        Certification {
            status: CertificationStatus::Unproved,
            justification: String::new(),
        }
    }
}

/// A placeholder for a term to be determined later. Uninstantiated
/// metavariables block a state from counting as proved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetavariableInfo {
    pub name: String,
    pub typ: Type,
    pub instantiated: bool,
    pub instantiation: Option<TermRef>,
}

/// A sequent (hypotheses entail goal) plus the bookkeeping that ties it
/// into the proof DAG. Immutable after construction except through the
/// context's monotone operations: metavariables may be added, an
/// uninstantiated metavariable may be instantiated once, and the
/// certification may be set once.
#[derive(Debug, Clone)]
pub struct ProofState {
    parent: Option<StateId>,
    hypotheses: Vector<Hypothesis>,
    goal: TermRef,
    last_step: Option<ProofStep>,
    metavariables: OrdMap<String, MetavariableInfo>,
    depth: usize,
    certification: Certification,
    hash: u64,
}

/// Hypotheses combine commutatively so that states equal as multisets
/// share a hash.
fn state_hash(goal: &TermRef, hypotheses: &Vector<Hypothesis>) -> u64 {
    let mut hash = goal.term_hash();
    for hypothesis in hypotheses {
        hash = hash.wrapping_add(fxhash::hash64(hypothesis));
    }
    hash
}

impl ProofState {
    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    pub fn goal(&self) -> &TermRef {
        &self.goal
    }

    pub fn hypotheses(&self) -> &Vector<Hypothesis> {
        &self.hypotheses
    }

    pub fn last_step(&self) -> Option<&ProofStep> {
        self.last_step.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn certification(&self) -> &Certification {
        &self.certification
    }

    pub fn metavariables(&self) -> &OrdMap<String, MetavariableInfo> {
        &self.metavariables
    }

    pub fn state_hash(&self) -> u64 {
        self.hash
    }

    /// The first hypothesis with the given name, or None.
    pub fn find_hypothesis(&self, name: &str) -> Option<&Hypothesis> {
        self.hypotheses.iter().find(|hyp| hyp.name() == name)
    }

    pub fn find_metavariable(&self, name: &str) -> Option<&MetavariableInfo> {
        self.metavariables.get(name)
    }

    pub fn has_uninstantiated_metavariables(&self) -> bool {
        self.metavariables.values().any(|info| !info.instantiated)
    }

    /// Whether this state is settled: either its certification says so, or
    /// a hypothesis matches the goal exactly. Uninstantiated metavariables
    /// block the hypothesis check.
    pub fn is_proved(&self) -> bool {
        if self.certification.status.is_proved() {
            return true;
        }
        if self.has_uninstantiated_metavariables() {
            return false;
        }
        self.hypotheses.iter().any(|hyp| *hyp.formula() == self.goal)
    }

    /// Extensional equality: same goal, same hypotheses as a multiset, and
    /// the same metavariables. The path that led here does not matter.
    pub fn equals(&self, other: &ProofState) -> bool {
        if self.hash != other.hash {
            return false;
        }
        if self.goal != other.goal {
            return false;
        }
        if self.hypotheses.len() != other.hypotheses.len() {
            return false;
        }
        let mut matched = vec![false; other.hypotheses.len()];
        for hypothesis in &self.hypotheses {
            let mut found = false;
            for (i, candidate) in other.hypotheses.iter().enumerate() {
                if !matched[i] && hypothesis == candidate {
                    matched[i] = true;
                    found = true;
                    break;
                }
            }
            if !found {
                return false;
            }
        }
        self.metavariables == other.metavariables
    }
}

impl PartialEq for ProofState {
    fn eq(&self, other: &ProofState) -> bool {
        self.equals(other)
    }
}

/// Owns every proof state and deduplicates them: applying a rule that
/// reconstructs an existing state returns the existing id.
pub struct ProofContext {
    states: Vec<ProofState>,
    state_map: IntMap<u64, Vec<StateId>>,
}

impl ProofContext {
    pub fn new() -> ProofContext {
        ProofContext {
            states: vec![],
            state_map: IntMap::default(),
        }
    }

    /// A fresh root state with no hypotheses and no parent.
    pub fn create_initial_state(&mut self, goal: TermRef) -> StateId {
        let hypotheses = Vector::new();
        let hash = state_hash(&goal, &hypotheses);
        let state = ProofState {
            parent: None,
            hypotheses,
            goal,
            last_step: None,
            metavariables: OrdMap::new(),
            depth: 0,
            certification: Certification::default(),
            hash,
        };
        self.insert(state)
    }

    /// Builds the child state for a rule application: the parent's
    /// hypotheses plus the new ones, the new goal, a recorded proof step,
    /// and the parent's metavariables carried over. If an extensionally
    /// equal state already exists it is returned instead.
    pub fn apply_rule(
        &mut self,
        state: StateId,
        rule_name: &str,
        premise_names: Vec<String>,
        new_hypotheses: Vec<Hypothesis>,
        new_goal: TermRef,
    ) -> StateId {
        // The soundness hook accepts everything in this iteration; callers
        // must not rely on it to reject unsound applications.
        debug_assert!(Self::validate_rule_application(
            rule_name,
            &premise_names,
            &new_goal
        ));

        let parent = &self.states[state.0];
        let mut hypotheses = parent.hypotheses.clone();
        for hypothesis in new_hypotheses {
            hypotheses.push_back(hypothesis);
        }
        let metavariables = parent.metavariables.clone();
        let depth = parent.depth + 1;
        let hash = state_hash(&new_goal, &hypotheses);
        let child = ProofState {
            parent: Some(state),
            hypotheses,
            goal: new_goal.clone(),
            last_step: Some(ProofStep::new(rule_name, premise_names, new_goal)),
            metavariables,
            depth,
            certification: Certification::default(),
            hash,
        };

        if let Some(bucket) = self.state_map.get(&hash) {
            for &existing in bucket {
                if self.states[existing.0].equals(&child) {
                    debug!(state = %existing, rule = rule_name, "state already exists");
                    return existing;
                }
            }
        }
        self.insert(child)
    }

    fn validate_rule_application(
        _rule_name: &str,
        _premise_names: &[String],
        _conclusion: &TermRef,
    ) -> bool {
        // Rule validation is not implemented in this iteration.
        true
    }

    fn insert(&mut self, state: ProofState) -> StateId {
        let id = StateId(self.states.len());
        self.state_map.entry(state.hash).or_default().push(id);
        self.states.push(state);
        id
    }

    pub fn state(&self, id: StateId) -> &ProofState {
        &self.states[id.0]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &ProofState)> {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateId(i), state))
    }

    /// States that are no other state's parent, in creation order.
    pub fn get_leaf_states(&self) -> Vec<StateId> {
        let mut parents = FxHashSet::default();
        for state in &self.states {
            if let Some(parent) = state.parent {
                parents.insert(parent);
            }
        }
        self.states()
            .map(|(id, _)| id)
            .filter(|id| !parents.contains(id))
            .collect()
    }

    /// States for which `is_proved` holds, in creation order.
    pub fn get_proved_states(&self) -> Vec<StateId> {
        self.states()
            .filter(|(_, state)| state.is_proved())
            .map(|(id, _)| id)
            .collect()
    }

    /// The proof steps leading from the initial state to this one, in
    /// chronological order.
    pub fn get_proof_trace(&self, id: StateId) -> Vec<&ProofStep> {
        let mut trace = vec![];
        let mut current = Some(id);
        while let Some(state_id) = current {
            let state = &self.states[state_id.0];
            match state.last_step() {
                Some(step) => {
                    trace.push(step);
                    current = state.parent;
                }
                None => break,
            }
        }
        trace.reverse();
        trace
    }

    /// Adds a metavariable to a state. Adding a name twice is a caller
    /// error.
    pub fn add_metavariable(&mut self, id: StateId, name: &str, typ: Type) -> Result<()> {
        let state = &mut self.states[id.0];
        if state.metavariables.contains_key(name) {
            return Err(KernelError::DuplicateMetavariable(name.to_string()));
        }
        state.metavariables.insert(
            name.to_string(),
            MetavariableInfo {
                name: name.to_string(),
                typ,
                instantiated: false,
                instantiation: None,
            },
        );
        Ok(())
    }

    /// Instantiates an uninstantiated metavariable. Returns false when the
    /// metavariable does not exist or is already instantiated.
    pub fn instantiate_metavariable(&mut self, id: StateId, name: &str, term: TermRef) -> bool {
        let state = &mut self.states[id.0];
        match state.metavariables.get_mut(name) {
            Some(info) => {
                if info.instantiated {
                    return false;
                }
                info.instantiated = true;
                info.instantiation = Some(term);
                true
            }
            None => false,
        }
    }

    /// Certifies a state. The certification moves once, from unproved to a
    /// terminal status.
    pub fn mark_proved(
        &mut self,
        id: StateId,
        status: CertificationStatus,
        justification: &str,
    ) -> Result<()> {
        if !status.is_terminal() {
            return Err(KernelError::InvalidCertification);
        }
        let state = &mut self.states[id.0];
        if state.certification.status.is_terminal() {
            return Err(KernelError::AlreadyCertified(
                state.certification.status.to_string(),
            ));
        }
        state.certification = Certification {
            status,
            justification: justification.to_string(),
        };
        Ok(())
    }
}

impl Default for ProofContext {
    fn default() -> ProofContext {
        ProofContext::new()
    }
}

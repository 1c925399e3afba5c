//! Reordering between the physical (simulator / servo bus) joint order and
//! the policy (training) joint order.

use crate::error::ControlError;
use std::collections::HashMap;

/// Fixed permutation between the two joint conventions.
///
/// `policy[i] == physical[physical_index[i]]` for every policy slot `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JointMap {
    physical_index: Vec<usize>,
    policy_index: Vec<usize>,
}

impl JointMap {
    /// Build from the physical index of every policy slot.
    ///
    /// # Errors
    ///
    /// `InvalidPermutation` unless the table is a bijection on `0..len`.
    pub fn new(physical_index: Vec<usize>) -> Result<Self, ControlError> {
        let n = physical_index.len();
        let mut policy_index = vec![usize::MAX; n];
        for (slot, &physical) in physical_index.iter().enumerate() {
            if physical >= n {
                return Err(ControlError::InvalidPermutation(format!(
                    "index {physical} out of range for {n} joints"
                )));
            }
            if policy_index[physical] != usize::MAX {
                return Err(ControlError::InvalidPermutation(format!(
                    "physical joint {physical} mapped twice"
                )));
            }
            policy_index[physical] = slot;
        }
        Ok(Self {
            physical_index,
            policy_index,
        })
    }

    #[must_use]
    pub fn identity(n: usize) -> Self {
        Self {
            physical_index: (0..n).collect(),
            policy_index: (0..n).collect(),
        }
    }

    /// Derive the permutation from the joint names of both conventions.
    ///
    /// # Errors
    ///
    /// `InvalidPermutation` when the name lists are not the same set.
    pub fn from_names(physical: &[String], policy: &[String]) -> Result<Self, ControlError> {
        if physical.len() != policy.len() {
            return Err(ControlError::InvalidPermutation(format!(
                "{} physical joints but {} policy joints",
                physical.len(),
                policy.len()
            )));
        }
        let position: HashMap<&str, usize> = physical
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        let table = policy
            .iter()
            .map(|name| {
                position.get(name.as_str()).copied().ok_or_else(|| {
                    ControlError::InvalidPermutation(format!("unknown joint '{name}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(table)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.physical_index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.physical_index.is_empty()
    }

    /// Physical index of every policy slot.
    #[must_use]
    pub fn table(&self) -> &[usize] {
        &self.physical_index
    }

    /// # Errors
    ///
    /// `Shape` when the vector length differs from the joint count.
    pub fn to_policy_order(&self, physical: &[f32]) -> Result<Vec<f32>, ControlError> {
        ControlError::check_len("physical joint vector", self.len(), physical.len())?;
        Ok(self.physical_index.iter().map(|&j| physical[j]).collect())
    }

    /// # Errors
    ///
    /// `Shape` when the vector length differs from the joint count.
    pub fn to_physical_order(&self, policy: &[f32]) -> Result<Vec<f32>, ControlError> {
        ControlError::check_len("policy joint vector", self.len(), policy.len())?;
        Ok(self.policy_index.iter().map(|&i| policy[i]).collect())
    }
}

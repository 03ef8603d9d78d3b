use std::collections::BTreeMap;

use crate::error::SelectionError;
use crate::model::UnitGroup;

/// Target units picked on the selection view, for one visit.
///
/// Groups and occurrences each map to an optional target code. Picking a
/// target for a group overwrites the choice of every occurrence in it.
#[derive(Debug, Clone)]
pub struct SelectionState {
    groups: Vec<UnitGroup>,
    group_choices: BTreeMap<String, Option<String>>,
    occurrence_choices: BTreeMap<String, Option<String>>,
    /// Occurrence id → index of its group in `groups`
    owners: BTreeMap<String, usize>,
}

impl SelectionState {
    /// Start with every group and occurrence unset, whatever `to` the groups
    /// carry.
    pub fn new(groups: &[UnitGroup]) -> Self {
        let mut group_choices = BTreeMap::new();
        let mut occurrence_choices = BTreeMap::new();
        let mut owners = BTreeMap::new();
        for (index, group) in groups.iter().enumerate() {
            group_choices.insert(group.name.clone(), None);
            for unit in &group.units {
                occurrence_choices.insert(unit.id.clone(), None);
                owners.insert(unit.id.clone(), index);
            }
        }
        Self {
            groups: groups.to_vec(),
            group_choices,
            occurrence_choices,
            owners,
        }
    }

    pub fn groups(&self) -> &[UnitGroup] {
        &self.groups
    }

    /// Set (or with `None`/"" unset) the target of a whole group.
    pub fn select_group(&mut self, name: &str, target: Option<&str>) -> Result<(), SelectionError> {
        let group = self
            .groups
            .iter()
            .find(|group| group.name == name)
            .ok_or_else(|| SelectionError::UnknownGroup(name.to_string()))?;
        let target = checked_target(group, name, target)?;

        for unit in &group.units {
            self.occurrence_choices.insert(unit.id.clone(), target.clone());
        }
        self.group_choices.insert(name.to_string(), target);
        Ok(())
    }

    /// Set (or with `None`/"" unset) the target of one occurrence.
    pub fn select_occurrence(&mut self, id: &str, target: Option<&str>) -> Result<(), SelectionError> {
        let group = self
            .owners
            .get(id)
            .map(|index| &self.groups[*index])
            .ok_or_else(|| SelectionError::UnknownOccurrence(id.to_string()))?;
        let target = checked_target(group, id, target)?;

        self.occurrence_choices.insert(id.to_string(), target);
        Ok(())
    }

    pub fn group_choice(&self, name: &str) -> Option<&str> {
        self.group_choices.get(name).and_then(|choice| choice.as_deref())
    }

    pub fn occurrence_choice(&self, id: &str) -> Option<&str> {
        self.occurrence_choices.get(id).and_then(|choice| choice.as_deref())
    }

    /// Submit is enabled once any group or occurrence has a target.
    pub fn can_submit(&self) -> bool {
        self.group_choices
            .values()
            .chain(self.occurrence_choices.values())
            .any(Option::is_some)
    }

    /// Whether any occurrence would actually be converted.
    pub fn has_occurrence_selection(&self) -> bool {
        self.occurrence_choices.values().any(Option::is_some)
    }

    /// Unit groups for the conversion request. Selected occurrences carry
    /// their target in `to`; the others are passed through unchanged.
    pub fn build_convert_groups(&self) -> Vec<UnitGroup> {
        self.groups
            .iter()
            .map(|group| {
                let mut group = group.clone();
                for unit in &mut group.units {
                    if let Some(target) = self.occurrence_choice(&unit.id) {
                        unit.to = Some(target.to_string());
                    }
                }
                group
            })
            .collect()
    }
}

fn checked_target(
    group: &UnitGroup,
    key: &str,
    target: Option<&str>,
) -> Result<Option<String>, SelectionError> {
    match target.filter(|t| !t.is_empty()) {
        None => Ok(None),
        Some(target) if group.supports_target(target) => Ok(Some(target.to_string())),
        Some(target) => Err(SelectionError::UnsupportedTarget {
            key: key.to_string(),
            target: target.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::flour_groups;

    #[test]
    fn starts_with_nothing_selected() {
        let selection = SelectionState::new(&flour_groups());
        assert!(!selection.can_submit());
        assert!(!selection.has_occurrence_selection());
        assert_eq!(selection.group_choice("volume"), None);
    }

    #[test]
    fn ignores_targets_already_present_in_groups() {
        let mut groups = flour_groups();
        groups[0].units[0].to = Some("liter".to_string());
        let selection = SelectionState::new(&groups);
        assert_eq!(selection.occurrence_choice("u1"), None);
        assert!(!selection.can_submit());
    }

    #[test]
    fn single_occurrence_choice_enables_submit() {
        let mut selection = SelectionState::new(&flour_groups());
        selection.select_occurrence("u2", Some("ounce")).unwrap();
        assert!(selection.can_submit());
        assert!(selection.has_occurrence_selection());
        assert_eq!(selection.occurrence_choice("u1"), None);
    }

    #[test]
    fn group_choice_cascades_over_individual_choices() {
        let mut selection = SelectionState::new(&flour_groups());
        selection.select_occurrence("u1", Some("milliliter")).unwrap();
        selection.select_group("volume", Some("liter")).unwrap();

        assert_eq!(selection.group_choice("volume"), Some("liter"));
        assert_eq!(selection.occurrence_choice("u1"), Some("liter"));
        assert_eq!(selection.occurrence_choice("u3"), Some("liter"));
        assert_eq!(selection.occurrence_choice("u2"), None);
    }

    #[test]
    fn unsetting_a_group_unsets_its_members() {
        let mut selection = SelectionState::new(&flour_groups());
        selection.select_group("volume", Some("liter")).unwrap();
        selection.select_group("volume", Some("")).unwrap();

        assert!(!selection.can_submit());
        assert_eq!(selection.occurrence_choice("u1"), None);
    }

    #[test]
    fn group_choice_alone_enables_submit_even_if_members_are_cleared() {
        let mut selection = SelectionState::new(&flour_groups());
        selection.select_group("mass", Some("pound")).unwrap();
        selection.select_occurrence("u2", None).unwrap();

        assert!(selection.can_submit());
        assert!(!selection.has_occurrence_selection());
    }

    #[test]
    fn rejects_unknown_keys_and_targets() {
        let mut selection = SelectionState::new(&flour_groups());
        assert_eq!(
            selection.select_group("length", Some("meter")),
            Err(SelectionError::UnknownGroup("length".to_string()))
        );
        assert_eq!(
            selection.select_occurrence("u9", Some("liter")),
            Err(SelectionError::UnknownOccurrence("u9".to_string()))
        );
        assert!(matches!(
            selection.select_occurrence("u2", Some("liter")),
            Err(SelectionError::UnsupportedTarget { .. })
        ));
        assert!(!selection.can_submit());
    }

    #[test]
    fn convert_groups_carry_only_selected_targets() {
        let mut selection = SelectionState::new(&flour_groups());
        selection.select_occurrence("u1", Some("milliliter")).unwrap();

        let groups = selection.build_convert_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].units[0].to.as_deref(), Some("milliliter"));
        assert_eq!(groups[0].units[0].value, 2.0);
        assert_eq!(groups[0].units[1].to, None);
        assert_eq!(groups[1].units[0].to, None);
    }
}

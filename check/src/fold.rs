//! Sequential processor fold.
//!
//! Threads a model through a caller-ordered list of checks and stops at the
//! first check that fails. Checks after the failing one never run, and the
//! returned errors belong to the failing check alone.

use typegen_ir::model::CheckedModel;

/// Where and why a fold stopped.
#[derive(Debug)]
pub struct Halted<'p, P, E> {
    /// Index of the failing processor in the list.
    pub index: usize,
    /// The failing processor.
    pub processor: &'p P,
    /// Everything the failing processor reported.
    pub errors: Vec<E>,
}

/// Folds `check` over `processors`, starting from `initial`.
///
/// # Errors
///
/// Returns [`Halted`] for the first processor whose check fails.
pub fn fold_processors<'p, P, E, F>(
    processors: &'p [P],
    initial: CheckedModel,
    mut check: F,
) -> Result<CheckedModel, Halted<'p, P, E>>
where
    F: FnMut(&P, CheckedModel) -> Result<CheckedModel, Vec<E>>,
{
    let mut model = initial;
    for (index, processor) in processors.iter().enumerate() {
        model = match check(processor, model) {
            Ok(next) => next,
            Err(errors) => {
                return Err(Halted {
                    index,
                    processor,
                    errors,
                })
            }
        };
    }
    Ok(model)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use typegen_ir::model::UncheckedModel;
    use typegen_ir::property::Property;

    fn empty() -> CheckedModel {
        let model = UncheckedModel::new(vec![]).unwrap();
        CheckedModel::initial(typegen_ir::resolve(&model).unwrap())
    }

    #[derive(Debug)]
    enum Step {
        Fail(&'static str),
        Set(&'static str),
    }

    #[test]
    fn halts_at_first_failure_and_skips_the_rest() {
        let steps = [Step::Fail("a broke"), Step::Set("b")];
        let mut invoked = Vec::new();
        let halted = fold_processors(&steps, empty(), |step, model| {
            invoked.push(format!("{step:?}"));
            match step {
                Step::Fail(msg) => Err(vec![*msg]),
                Step::Set(_) => Ok(model),
            }
        })
        .unwrap_err();
        assert_eq!(halted.index, 0);
        assert_eq!(halted.errors, ["a broke"]);
        assert_eq!(invoked.len(), 1, "later processors must not run");
    }

    #[test]
    fn threads_the_model_through_every_step() {
        let steps = [Step::Set("a"), Step::Set("b"), Step::Set("a")];
        let mut counter = 0;
        let model = fold_processors::<_, (), _>(&steps, empty(), |step, mut model| {
            counter += 1;
            if let Step::Set(slot) = step {
                model
                    .properties
                    .insert(*slot, Property::String(counter.to_string()));
            }
            Ok(model)
        })
        .unwrap();
        assert_eq!(model.properties.get("a"), Some(&Property::String("3".into())));
        assert_eq!(model.properties.get("b"), Some(&Property::String("2".into())));
    }

    #[test]
    fn empty_list_returns_the_initial_model() {
        let steps: [Step; 0] = [];
        let model = fold_processors::<_, (), _>(&steps, empty(), |_, m| Ok(m)).unwrap();
        assert!(model.properties.is_empty());
    }
}

use rand::seq::SliceRandom;
use rand::Rng;

use crate::quiz::{Category, PollContent, QuizError, Selection, Task};

const EXPLANATION_OPEN: char = '(';
const EXPLANATION_CLOSE: char = ')';

/// Picks one task uniformly from everything the catalog has for `category`.
pub fn pick_task<'a, R: Rng + ?Sized>(
    category: Category,
    tasks: &'a [Task],
    rng: &mut R,
) -> Result<&'a Task, QuizError> {
    tasks
        .choose(rng)
        .ok_or(QuizError::NoTasksAvailable(category))
}

/// Turns a catalog task into a quiz poll.
///
/// Categories 9-12 and 7 sample a few options from the pool and make sure the
/// chosen correct answer is among them, so the option list may end up one
/// longer than the sample size. Every other category shows the whole pool.
pub fn build<R: Rng + ?Sized>(
    category: Category,
    task: &Task,
    rng: &mut R,
) -> Result<PollContent, QuizError> {
    validate(category, task)?;

    let (correct_answer, mut explanation, mut options) = match category.selection() {
        Selection::MultiAnswer { sample_size } => {
            let correct = choose_correct(task, rng)?.to_string();
            let options = sample_with_answer(&task.option_pool, &correct, sample_size, rng);
            (correct, None, options)
        }
        Selection::InlineExplained { sample_size } => {
            let raw = choose_correct(task, rng)?;
            let (correct, inline) = split_inline_explanation(task.id, raw)?;
            let options = sample_with_answer(&task.option_pool, &correct, sample_size, rng);
            (correct, inline, options)
        }
        Selection::Fixed => {
            let correct = match task.correct_answers.as_slice() {
                [single] => single.clone(),
                _ => {
                    return Err(QuizError::invalid(
                        task.id,
                        format!(
                            "expected exactly one correct answer, got {}",
                            task.correct_answers.len()
                        ),
                    ))
                }
            };
            if !task.option_pool.contains(&correct) {
                return Err(QuizError::invalid(
                    task.id,
                    format!("correct answer {:?} is not among the options", correct),
                ));
            }
            (correct, None, task.option_pool.clone())
        }
    };

    // A rule always wins over an inline explanation
    if let Some(rule) = task.rule.as_deref().filter(|r| !r.text.is_empty()) {
        explanation = Some(rule.text.replace("\\n", "\n"));
    }

    // We shuffle the options so the correct one isn't always the last one
    options.shuffle(rng);
    let correct_index = options
        .iter()
        .position(|o| *o == correct_answer)
        .ok_or_else(|| QuizError::invalid(task.id, "correct answer lost while shuffling"))?;

    Ok(PollContent {
        question: task.question.clone(),
        options,
        correct_index,
        explanation,
    })
}

fn validate(category: Category, task: &Task) -> Result<(), QuizError> {
    if task.category != category {
        return Err(QuizError::invalid(
            task.id,
            format!("task is of type {}, requested {}", task.category, category),
        ));
    }
    if task.option_pool.is_empty() {
        return Err(QuizError::invalid(task.id, "option pool is empty"));
    }
    if let Some(repeated) = task
        .option_pool
        .iter()
        .enumerate()
        .find(|&(i, o)| task.option_pool[..i].contains(o))
        .map(|(_, o)| o)
    {
        return Err(QuizError::invalid(
            task.id,
            format!("option {:?} is repeated in the pool", repeated),
        ));
    }
    if task.correct_answers.is_empty() {
        return Err(QuizError::invalid(task.id, "no correct answers"));
    }
    if task.correct_answers.iter().any(|a| a.is_empty()) {
        return Err(QuizError::invalid(task.id, "empty correct answer"));
    }
    Ok(())
}

fn choose_correct<'a, R: Rng + ?Sized>(task: &'a Task, rng: &mut R) -> Result<&'a str, QuizError> {
    task.correct_answers
        .choose(rng)
        .map(String::as_str)
        .ok_or_else(|| QuizError::invalid(task.id, "no correct answers"))
}

/// Splits `answer(explanation)` on the first opening bracket.
/// A string without the bracket is a bare answer with no explanation.
pub fn split_inline_explanation(
    task_id: u32,
    raw: &str,
) -> Result<(String, Option<String>), QuizError> {
    match raw.split_once(EXPLANATION_OPEN) {
        Some((answer, explanation)) => {
            if answer.is_empty() {
                return Err(QuizError::invalid(
                    task_id,
                    format!("no answer before the explanation in {:?}", raw),
                ));
            }
            let explanation = explanation.trim_end_matches(EXPLANATION_CLOSE);
            Ok((answer.to_string(), Some(explanation.to_string())))
        }
        None => Ok((raw.to_string(), None)),
    }
}

/// Draws up to `sample_size` distinct options and appends `correct` if the
/// draw missed it.
fn sample_with_answer<R: Rng + ?Sized>(
    pool: &[String],
    correct: &str,
    sample_size: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut options: Vec<String> = pool
        .choose_multiple(rng, sample_size.min(pool.len()))
        .cloned()
        .collect();
    if !options.iter().any(|o| o == correct) {
        options.push(correct.to_string());
    }
    options
}

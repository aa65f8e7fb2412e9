//! Scripted in-memory device for unit tests

use super::DeviceControl;
use crate::error::{KpiError, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

enum Reply {
    Lines(Vec<String>),
    Fail(String),
}

struct Rule {
    needle: String,
    replies: VecDeque<Reply>,
}

/// Answers commands by substring match; the first matching rule wins
///
/// A rule with several queued replies hands them out in order and keeps
/// repeating the last one. Unmatched commands return no output.
#[derive(Default)]
pub struct ScriptedDevice {
    rules: Mutex<Vec<Rule>>,
    issued: Mutex<Vec<String>>,
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, needle: &str, lines: &[&str]) -> Self {
        self.respond_seq(needle, &[lines])
    }

    pub fn respond_seq(self, needle: &str, replies: &[&[&str]]) -> Self {
        let replies = replies
            .iter()
            .map(|lines| Reply::Lines(lines.iter().map(|l| l.to_string()).collect()))
            .collect();
        self.push_rule(needle, replies)
    }

    pub fn fail(self, needle: &str, reason: &str) -> Self {
        self.push_rule(needle, VecDeque::from([Reply::Fail(reason.to_string())]))
    }

    fn push_rule(self, needle: &str, replies: VecDeque<Reply>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            replies,
        });
        self
    }

    pub fn issued(&self) -> Vec<String> {
        self.issued.lock().unwrap().clone()
    }

    pub fn count_issued(&self, needle: &str) -> usize {
        self.issued
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }
}

impl DeviceControl for ScriptedDevice {
    fn execute(&self, _dsn: &str, command: &str) -> Result<Vec<String>> {
        self.issued.lock().unwrap().push(command.to_string());
        let mut rules = self.rules.lock().unwrap();
        let Some(rule) = rules.iter_mut().find(|r| command.contains(&r.needle)) else {
            return Ok(Vec::new());
        };
        let reply = if rule.replies.len() > 1 {
            rule.replies.pop_front()
        } else {
            None
        };
        let reply = reply.as_ref().or(rule.replies.front());
        match reply {
            Some(Reply::Lines(lines)) => Ok(lines.clone()),
            Some(Reply::Fail(reason)) => Err(KpiError::command(command, reason.clone())),
            None => Ok(Vec::new()),
        }
    }
}

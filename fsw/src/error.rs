// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

#[derive(Debug, onlyerror::Error)]
pub enum Error {
    #[error("failed to schedule a task")]
    Sched(#[from] sched::Error),
    #[error("data store operation failed")]
    Store(#[from] obdh::Error),
    #[error("co-processor transport failed")]
    Transport(#[from] framed::Error),
    #[error("file I/O failed")]
    Io(#[from] std::io::Error),

    #[error("unknown mode '{0}'")]
    UnknownMode(String),
    #[error("no transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
    #[error("mode table references unknown task '{0}'")]
    UnknownTask(String),
    #[error("task '{0}' is registered twice")]
    DuplicateTask(String),
    #[error("task id {0} is registered twice")]
    DuplicateTaskId(u8),
    #[error("the state manager was already started")]
    AlreadyStarted,
}

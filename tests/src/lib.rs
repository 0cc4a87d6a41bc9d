//! End to end tests of the pipe over a scripted binlog stream.

#[cfg(test)]
mod support;

#[cfg(test)]
mod test_pipe;

#[cfg(test)]
mod test_checkpoint;

#[cfg(test)]
mod test_pipe_manager;

// src/proc/action.rs

//! The user-supplied body of an [`AsyncProc`](crate::AsyncProc).

/// Work performed once when a proc fires.
///
/// The action is consumed by its single invocation. Any closure
/// `FnOnce() -> anyhow::Result<()>` is an action; concrete task types can
/// implement the trait on their own structs instead.
///
/// ```
/// use asyncproc::Action;
///
/// struct Print(&'static str);
///
/// impl Action for Print {
///     fn run(self: Box<Self>) -> anyhow::Result<()> {
///         println!("{}", self.0);
///         Ok(())
///     }
/// }
/// ```
pub trait Action: Send + 'static {
    fn run(self: Box<Self>) -> anyhow::Result<()>;
}

impl<F> Action for F
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    fn run(self: Box<Self>) -> anyhow::Result<()> {
        (*self)()
    }
}

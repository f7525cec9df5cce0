use tileqa_geom::Envelope;

///
/// ProgressStep
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressStep {
    RunBegin,
    TileProcessing,
    TileCompleting,
    RunCompleted,
}

///
/// Progress
///
/// One step-scoped notification from the scheduler. `current`/`total`
/// count tiles.
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    pub step: ProgressStep,
    pub current: usize,
    pub total: usize,
    pub envelope: Option<Envelope>,
}

///
/// RowAction
///
/// Reply of the per-row notification hook: run the row, skip it, or
/// stop the whole run at the next row boundary.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RowAction {
    #[default]
    Continue,
    Skip,
    Stop,
}

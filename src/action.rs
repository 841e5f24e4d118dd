/// Actions that a user or application can initiate on the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeAction<Custom = ()> {
    /// Move the lead (and selection) to the previous row.
    SelectPrev,
    /// Move the lead (and selection) to the next row.
    SelectNext,
    /// Collapse the lead if it is expanded; otherwise move to its parent.
    SelectParent,
    /// Expand the lead if it is collapsed; otherwise move to its first child.
    SelectChild,
    /// Move the lead up, selecting every row between the anchor and the lead.
    ExtendSelectionUp,
    /// Move the lead down, selecting every row between the anchor and the lead.
    ExtendSelectionDown,
    /// Select the first row.
    SelectFirst,
    /// Select the last row.
    SelectLast,
    /// Toggle expansion of the lead only.
    ToggleNode,
    /// Expand or collapse the whole subtree under the lead.
    ToggleRecursive,
    /// Expand every node in the tree.
    ExpandAll,
    /// Collapse every node in the tree.
    CollapseAll,
    /// Start editing the lead.
    StartEditing,
    /// Finish the current edit, keeping its result.
    StopEditing,
    /// Abandon the current edit.
    CancelEditing,
    /// Deselect everything.
    ClearSelection,
    /// Custom action forwarded to the caller without internal handling.
    Custom(Custom),
}

/// Result of handling an action or key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeEvent<Custom = ()> {
    /// The action was handled internally and state was updated.
    Handled,
    /// The action was ignored (e.g., no rows / nothing to do).
    Unhandled,
    /// The action is forwarded to the caller for handling.
    Action(TreeAction<Custom>),
}

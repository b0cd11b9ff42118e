pub(crate) mod countdown;

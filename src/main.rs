fn main() -> anyhow::Result<()> {
    trace_select::run()
}

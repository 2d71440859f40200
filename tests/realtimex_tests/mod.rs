mod flow_test;
mod http_test;

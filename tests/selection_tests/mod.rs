mod store_test;
